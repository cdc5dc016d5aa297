//! Task / Project - ワーカーが読む側のモデル
//!
//! タスクの CRUD はこのクレートの外側（ストア実装の seed 用ヘルパー）にしかなく、
//! ここにはレポート集計に必要な形だけを置いています。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProjectId, TaskId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status '{0}'")]
pub struct UnknownTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(UnknownTaskStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::High => "HIGH",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task priority '{0}'")]
pub struct UnknownTaskPriority(pub String);

impl FromStr for TaskPriority {
    type Err = UnknownTaskPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(TaskPriority::High),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "LOW" => Ok(TaskPriority::Low),
            other => Err(UnknownTaskPriority(other.to_string())),
        }
    }
}

/// 担当者（集計では名前しか使わない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: UserId,
    pub name: String,
}

/// TaskSnapshot はワーカーが集計に使うタスクの読み取り専用ビュー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub assignee: Option<Assignee>,
}

impl TaskSnapshot {
    /// 期限を過ぎていて、まだ DONE になっていない
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < now)
    }
}

/// Project - 認可判定に必要な最小限の情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner_id: UserId,
}

impl Project {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn snapshot(status: TaskStatus, due_date: Option<DateTime<Utc>>) -> TaskSnapshot {
        TaskSnapshot {
            id: TaskId::new("t1"),
            status,
            priority: None,
            due_date,
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            assignee: None,
        }
    }

    #[rstest]
    #[case::past_todo(TaskStatus::Todo, Some(-1), true)]
    #[case::past_in_progress(TaskStatus::InProgress, Some(-1), true)]
    #[case::past_but_done(TaskStatus::Done, Some(-1), false)]
    #[case::future(TaskStatus::Todo, Some(1), false)]
    #[case::exactly_now(TaskStatus::Todo, Some(0), false)]
    #[case::no_due_date(TaskStatus::Todo, None, false)]
    fn overdue_rule(
        #[case] status: TaskStatus,
        #[case] due_offset_days: Option<i64>,
        #[case] expected: bool,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let due = due_offset_days.map(|d| now + Duration::days(d));
        assert_eq!(snapshot(status, due).is_overdue(now), expected);
    }

    #[test]
    fn enum_wire_names() {
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(
            serde_json::to_string(&TaskPriority::Medium).unwrap(),
            "\"MEDIUM\""
        );
        assert!("URGENT".parse::<TaskPriority>().is_err());
    }
}
