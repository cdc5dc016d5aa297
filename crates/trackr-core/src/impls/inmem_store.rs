//! InMemoryTaskStore - テスト・開発用の正本
//!
//! 状態遷移は SQLite 実装と同じく「現在の状態を条件にした書き込み」で、
//! ロックを 1 回取る間に判定と更新を済ませます。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ids::{ProjectId, ReportId, TaskId, UserId};
use crate::domain::report::{Page, Report, ReportStatus, ReportTransition};
use crate::domain::task::{Project, TaskSnapshot};
use crate::ports::{StoreError, TaskStore};

#[derive(Default)]
struct State {
    projects: HashMap<ProjectId, Project>,
    members: HashSet<(ProjectId, UserId)>,
    /// 挿入順を保つ
    tasks: Vec<(ProjectId, TaskSnapshot)>,
    reports: HashMap<ReportId, Report>,
}

/// InMemoryTaskStore は HashMap ベースの TaskStore
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<State>,
    task_queries: AtomicUsize,
    fail_task_reads: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_project(&self, project: Project) {
        let mut state = self.state.lock().await;
        state.projects.insert(project.id.clone(), project);
    }

    pub async fn remove_project(&self, project_id: &ProjectId) {
        self.state.lock().await.projects.remove(project_id);
    }

    pub async fn add_member(&self, project_id: &ProjectId, user_id: &UserId) {
        let mut state = self.state.lock().await;
        state.members.insert((project_id.clone(), user_id.clone()));
    }

    /// 同じ ID のタスクがあれば置き換える
    pub async fn put_task(&self, project_id: &ProjectId, task: TaskSnapshot) {
        let mut state = self.state.lock().await;
        match state.tasks.iter_mut().find(|(_, t)| t.id == task.id) {
            Some(slot) => *slot = (project_id.clone(), task),
            None => state.tasks.push((project_id.clone(), task)),
        }
    }

    pub async fn remove_task(&self, task_id: &TaskId) {
        self.state.lock().await.tasks.retain(|(_, t)| &t.id != task_id);
    }

    /// レポート行を消す（ワーカーが行の消失に耐えるかを試す用）
    pub async fn remove_report(&self, report_id: &ReportId) {
        self.state.lock().await.reports.remove(report_id);
    }

    /// find_tasks_by_project が呼ばれた回数
    pub fn task_query_count(&self) -> usize {
        self.task_queries.load(Ordering::SeqCst)
    }

    /// true の間、find_tasks_by_project が Unavailable を返す
    pub fn fail_task_reads(&self, fail: bool) {
        self.fail_task_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.state.lock().await.projects.get(project_id).cloned())
    }

    async fn is_member(&self, project_id: &ProjectId, user_id: &UserId) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .contains(&(project_id.clone(), user_id.clone())))
    }

    async fn find_tasks_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<TaskSnapshot>, StoreError> {
        self.task_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_task_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("task reads disabled".to_string()));
        }

        let state = self.state.lock().await;
        Ok(state
            .tasks
            .iter()
            .filter(|(pid, _)| pid == project_id)
            .map(|(_, task)| task.clone())
            .collect())
    }

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.reports.insert(report.id.clone(), report.clone());
        Ok(())
    }

    async fn find_report(&self, report_id: &ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.state.lock().await.reports.get(report_id).cloned())
    }

    async fn find_reports_by_project(
        &self,
        project_id: &ProjectId,
        page: Page,
    ) -> Result<Vec<Report>, StoreError> {
        let state = self.state.lock().await;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|r| &r.project_id == project_id)
            .cloned()
            .collect();
        // 新しい順。同時刻は ID 降順で安定させる
        reports.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(reports
            .into_iter()
            .skip(page.skip as usize)
            .take(page.take as usize)
            .collect())
    }

    async fn update_report_status(
        &self,
        report_id: &ReportId,
        transition: ReportTransition,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let report = state
            .reports
            .get_mut(report_id)
            .ok_or_else(|| StoreError::report_not_found(report_id))?;
        report.apply(transition)?;
        Ok(())
    }

    async fn discard_report(&self, report_id: &ReportId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let pending = state
            .reports
            .get(report_id)
            .is_some_and(|r| r.status == ReportStatus::Pending);
        if pending {
            state.reports.remove(report_id);
        }
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ReportType;
    use crate::domain::summary::ReportSummary;
    use chrono::{Duration, TimeZone, Utc};

    fn report(id: &str, minutes: i64) -> Report {
        Report::pending(
            ReportId::new(id),
            ProjectId::new("p1"),
            UserId::new("u1"),
            ReportType::Weekly,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn reports_are_listed_newest_first() {
        let store = InMemoryTaskStore::new();
        for (id, minutes) in [("r1", 0), ("r2", 10), ("r3", 5)] {
            store.insert_report(&report(id, minutes)).await.unwrap();
        }

        let page = store
            .find_reports_by_project(&ProjectId::new("p1"), Page::new(0, 2))
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);

        let rest = store
            .find_reports_by_project(&ProjectId::new("p1"), Page::new(2, 10))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id.as_str(), "r1");
    }

    #[tokio::test]
    async fn status_update_is_conditional() {
        let store = InMemoryTaskStore::new();
        let id = ReportId::new("r1");
        store.insert_report(&report("r1", 0)).await.unwrap();

        // PENDING から直接 COMPLETED にはできない
        let err = store
            .update_report_status(
                &id,
                ReportTransition::Complete {
                    summary: ReportSummary::default(),
                    completed_at: Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition(_)));

        store
            .update_report_status(&id, ReportTransition::StartProcessing)
            .await
            .unwrap();
        let err = store
            .update_report_status(&id, ReportTransition::StartProcessing)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition(_)));

        let missing = store
            .update_report_status(&ReportId::new("nope"), ReportTransition::Fail)
            .await
            .unwrap_err();
        assert!(matches!(missing, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn discard_only_removes_pending_reports() {
        let store = InMemoryTaskStore::new();
        store.insert_report(&report("r1", 0)).await.unwrap();
        store.insert_report(&report("r2", 0)).await.unwrap();
        store
            .update_report_status(&ReportId::new("r2"), ReportTransition::StartProcessing)
            .await
            .unwrap();

        assert!(store.discard_report(&ReportId::new("r1")).await.unwrap());
        assert!(!store.discard_report(&ReportId::new("r2")).await.unwrap());
        assert!(store.find_report(&ReportId::new("r1")).await.unwrap().is_none());
        assert!(store.find_report(&ReportId::new("r2")).await.unwrap().is_some());
    }
}
