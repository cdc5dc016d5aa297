//! Summary - レポート集計とプロジェクトサマリー
//!
//! どちらも「タスク一覧 + 現在時刻」から決まる純粋関数です。
//! 時刻は引数で受け取るので、テストでは固定時刻を渡せます。

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::task::{TaskPriority, TaskSnapshot, TaskStatus};

/// 担当者なしのタスクを数えるキー
pub const UNASSIGNED: &str = "Unassigned";

/// tasksByPriority の内訳
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub none: u64,
}

/// ReportSummary は完了したレポートに添付される集計結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub in_progress_tasks: u64,
    pub todo_tasks: u64,
    pub overdue_tasks: u64,
    pub completed_this_week: u64,
    pub tasks_by_priority: PriorityBreakdown,
    pub tasks_by_assignee: BTreeMap<String, u64>,
    pub generated_at: DateTime<Utc>,
}

impl ReportSummary {
    /// 直近 7 日間を「今週」とみなす
    pub const WEEK_DAYS: i64 = 7;

    /// タスク一覧から集計する
    ///
    /// `todo + in_progress + completed == total` は常に成り立つ
    /// （TaskStatus が 3 値しかないため）。
    pub fn compute(tasks: &[TaskSnapshot], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(Self::WEEK_DAYS);
        let mut summary = ReportSummary {
            total_tasks: tasks.len() as u64,
            generated_at: now,
            ..Default::default()
        };

        for task in tasks {
            match task.status {
                TaskStatus::Todo => summary.todo_tasks += 1,
                TaskStatus::InProgress => summary.in_progress_tasks += 1,
                TaskStatus::Done => {
                    summary.completed_tasks += 1;
                    if task.updated_at >= week_ago {
                        summary.completed_this_week += 1;
                    }
                }
            }

            if task.is_overdue(now) {
                summary.overdue_tasks += 1;
            }

            let priority = &mut summary.tasks_by_priority;
            match task.priority {
                Some(TaskPriority::High) => priority.high += 1,
                Some(TaskPriority::Medium) => priority.medium += 1,
                Some(TaskPriority::Low) => priority.low += 1,
                None => priority.none += 1,
            }

            let name = task
                .assignee
                .as_ref()
                .map(|a| a.name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(UNASSIGNED);
            *summary.tasks_by_assignee.entry(name.to_string()).or_insert(0) += 1;
        }

        summary
    }
}

/// ProjectSummary はキャッシュされる軽量サマリー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub total: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub todo: u64,
    pub overdue: u64,
}

impl ProjectSummary {
    pub fn compute(tasks: &[TaskSnapshot], now: DateTime<Utc>) -> Self {
        tasks.iter().fold(
            ProjectSummary {
                total: tasks.len() as u64,
                ..Default::default()
            },
            |mut acc, task| {
                match task.status {
                    TaskStatus::Todo => acc.todo += 1,
                    TaskStatus::InProgress => acc.in_progress += 1,
                    TaskStatus::Done => acc.completed += 1,
                }
                if task.is_overdue(now) {
                    acc.overdue += 1;
                }
                acc
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{TaskId, UserId};
    use crate::domain::task::Assignee;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn task(
        id: &str,
        status: TaskStatus,
        priority: Option<TaskPriority>,
        due_date: Option<DateTime<Utc>>,
    ) -> TaskSnapshot {
        TaskSnapshot {
            id: TaskId::new(id),
            status,
            priority,
            due_date,
            updated_at: now() - Duration::days(30),
            assignee: None,
        }
    }

    /// 3 タスクの例: 完了(HIGH) / TODO(LOW) / 期限切れの進行中(優先度なし)
    fn three_tasks() -> Vec<TaskSnapshot> {
        vec![
            task("t1", TaskStatus::Done, Some(TaskPriority::High), None),
            task("t2", TaskStatus::Todo, Some(TaskPriority::Low), None),
            task(
                "t3",
                TaskStatus::InProgress,
                None,
                Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            ),
        ]
    }

    #[test]
    fn three_task_example() {
        let summary = ReportSummary::compute(&three_tasks(), now());

        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.in_progress_tasks, 1);
        assert_eq!(summary.todo_tasks, 1);
        assert_eq!(summary.overdue_tasks, 1);
        assert_eq!(
            summary.tasks_by_priority,
            PriorityBreakdown {
                high: 1,
                medium: 0,
                low: 1,
                none: 1
            }
        );
        assert_eq!(summary.tasks_by_assignee.len(), 1);
        assert_eq!(summary.tasks_by_assignee[UNASSIGNED], 3);
        assert_eq!(summary.generated_at, now());
    }

    #[test]
    fn summary_json_shape() {
        let v = serde_json::to_value(ReportSummary::compute(&three_tasks(), now())).unwrap();
        assert_eq!(v["totalTasks"], 3);
        assert_eq!(v["completedThisWeek"], 0);
        assert_eq!(v["tasksByPriority"]["none"], 1);
        assert_eq!(v["tasksByAssignee"]["Unassigned"], 3);
        assert!(v["generatedAt"].is_string());
    }

    #[test]
    fn empty_project_has_zero_counts() {
        let summary = ReportSummary::compute(&[], now());
        assert_eq!(summary.total_tasks, 0);
        assert_eq!(summary.tasks_by_priority, PriorityBreakdown::default());
        assert!(summary.tasks_by_assignee.is_empty());
        assert_eq!(ProjectSummary::compute(&[], now()), ProjectSummary::default());
    }

    #[rstest]
    #[case::yesterday(1, 1)]
    #[case::six_days(6, 1)]
    #[case::exactly_a_week(7, 1)]
    #[case::eight_days(8, 0)]
    fn completed_this_week_window(#[case] days_ago: i64, #[case] expected: u64) {
        let mut done = task("t1", TaskStatus::Done, None, None);
        done.updated_at = now() - Duration::days(days_ago);
        let summary = ReportSummary::compute(&[done], now());
        assert_eq!(summary.completed_this_week, expected);
    }

    #[test]
    fn recently_updated_but_open_task_is_not_completed_this_week() {
        let mut open = task("t1", TaskStatus::InProgress, None, None);
        open.updated_at = now();
        assert_eq!(ReportSummary::compute(&[open], now()).completed_this_week, 0);
    }

    #[test]
    fn tasks_grouped_by_assignee_name() {
        let assign = |mut t: TaskSnapshot, name: &str| {
            t.assignee = Some(Assignee {
                id: UserId::new(name.to_lowercase()),
                name: name.to_string(),
            });
            t
        };
        let tasks = vec![
            assign(task("t1", TaskStatus::Todo, None, None), "Alice"),
            assign(task("t2", TaskStatus::Done, None, None), "Alice"),
            assign(task("t3", TaskStatus::Todo, None, None), "Bob"),
            task("t4", TaskStatus::Todo, None, None),
        ];

        let by_assignee = ReportSummary::compute(&tasks, now()).tasks_by_assignee;
        assert_eq!(by_assignee["Alice"], 2);
        assert_eq!(by_assignee["Bob"], 1);
        assert_eq!(by_assignee[UNASSIGNED], 1);
    }

    #[test]
    fn status_counts_partition_total() {
        let statuses = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];
        let tasks: Vec<_> = (0..17)
            .map(|i| task(&format!("t{i}"), statuses[i % 3], None, None))
            .collect();

        let report = ReportSummary::compute(&tasks, now());
        assert_eq!(
            report.todo_tasks + report.in_progress_tasks + report.completed_tasks,
            report.total_tasks
        );

        let project = ProjectSummary::compute(&tasks, now());
        assert_eq!(project.todo + project.in_progress + project.completed, project.total);
    }

    #[test]
    fn project_summary_matches_example() {
        let summary = ProjectSummary::compute(&three_tasks(), now());
        assert_eq!(
            summary,
            ProjectSummary {
                total: 3,
                completed: 1,
                in_progress: 1,
                todo: 1,
                overdue: 1
            }
        );
        let v = serde_json::to_value(summary).unwrap();
        assert_eq!(v["inProgress"], 1);
    }
}
