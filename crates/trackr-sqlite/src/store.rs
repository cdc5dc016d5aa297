//! SqliteTaskStore - sqlx/SQLite による TaskStore 実装
//!
//! 状態遷移は `UPDATE ... WHERE id = ? AND status = ?` の 1 文で行う。
//! 0 行だった場合だけ読み直して NotFound / InvalidTransition を判定する。

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info};

use trackr_core::domain::{
    Assignee, Page, Project, ProjectId, Report, ReportId, ReportStatus, ReportSummary,
    ReportTransition, ReportType, TaskId, TaskPriority, TaskSnapshot, TaskStatus, TransitionError, UserId,
};
use trackr_core::ports::{StoreError, TaskStore};

use crate::schema;

/// プロジェクト内の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Owner => "OWNER",
            MemberRole::Member => "MEMBER",
        }
    }
}

pub struct NewUser<'a> {
    pub id: &'a UserId,
    pub email: &'a str,
    pub name: &'a str,
}

pub struct NewProject<'a> {
    pub id: &'a ProjectId,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub owner_id: &'a UserId,
}

pub struct NewTask<'a> {
    pub id: &'a TaskId,
    pub title: &'a str,
    pub status: TaskStatus,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<&'a UserId>,
}

pub struct SqliteTaskStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    owner_id: String,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    status: String,
    priority: Option<String>,
    due_date_ms: Option<i64>,
    updated_at_ms: i64,
    assignee_id: Option<String>,
    assignee_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: String,
    project_id: String,
    user_id: String,
    report_type: String,
    status: String,
    summary: Option<String>,
    requested_at_ms: i64,
    completed_at_ms: Option<i64>,
}

const REPORT_COLUMNS: &str =
    "id, project_id, user_id, report_type, status, summary, requested_at_ms, completed_at_ms";

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn corrupt(what: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(what.to_string())
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| corrupt(format!("timestamp out of range: {ms}")))
}

impl TryFrom<TaskRow> for TaskSnapshot {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let assignee = match (row.assignee_id, row.assignee_name) {
            (Some(id), Some(name)) => Some(Assignee {
                id: UserId::new(id),
                name,
            }),
            _ => None,
        };
        Ok(TaskSnapshot {
            status: row.status.parse::<TaskStatus>().map_err(corrupt)?,
            priority: row
                .priority
                .as_deref()
                .map(TaskPriority::from_str)
                .transpose()
                .map_err(corrupt)?,
            due_date: row.due_date_ms.map(from_millis).transpose()?,
            updated_at: from_millis(row.updated_at_ms)?,
            assignee,
            id: TaskId::new(row.id),
        })
    }
}

impl TryFrom<ReportRow> for Report {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let summary = row
            .summary
            .as_deref()
            .map(serde_json::from_str::<ReportSummary>)
            .transpose()
            .map_err(corrupt)?;
        Ok(Report {
            id: ReportId::new(row.id),
            project_id: ProjectId::new(row.project_id),
            user_id: UserId::new(row.user_id),
            report_type: row.report_type.parse::<ReportType>().map_err(corrupt)?,
            status: row.status.parse::<ReportStatus>().map_err(corrupt)?,
            summary,
            requested_at: from_millis(row.requested_at_ms)?,
            completed_at: row.completed_at_ms.map(from_millis).transpose()?,
        })
    }
}

impl SqliteTaskStore {
    /// ファイル DB に接続してスキーマを作る（なければファイルも作る）
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_error)?
            .create_if_missing(true);
        info!("Connecting to SQLite database: {}", database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;
        Self::from_pool(pool).await
    }

    /// テスト用のメモリ DB
    ///
    /// `sqlite::memory:` は接続ごとに別 DB なので、接続を 1 本に固定して使い回す。
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error)?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        schema::apply(&pool).await.map_err(db_error)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_user(&self, user: NewUser<'_>, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, email, name, created_at_ms) VALUES (?1, ?2, ?3, ?4)")
            .bind(user.id.as_str())
            .bind(user.email)
            .bind(user.name)
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// プロジェクトを作り、オーナーを OWNER メンバーとしても登録する
    pub async fn create_project(
        &self,
        project: NewProject<'_>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query(
            "INSERT INTO projects (id, name, description, owner_id, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(project.id.as_str())
        .bind(project.name)
        .bind(project.description)
        .bind(project.owner_id.as_str())
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role, joined_at_ms) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(project.id.as_str())
        .bind(project.owner_id.as_str())
        .bind(MemberRole::Owner.as_str())
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        debug!(project_id = %project.id, "project created");
        Ok(())
    }

    /// すでにメンバーなら役割だけ更新する
    pub async fn add_member(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        role: MemberRole,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, role, joined_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (project_id, user_id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(project_id.as_str())
        .bind(user_id.as_str())
        .bind(role.as_str())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    pub async fn soft_delete_project(
        &self,
        project_id: &ProjectId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at_ms = ?1 WHERE id = ?2 AND deleted_at_ms IS NULL",
        )
        .bind(now.timestamp_millis())
        .bind(project_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_task(
        &self,
        project_id: &ProjectId,
        task: NewTask<'_>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, project_id, title, status, priority, due_date_ms, assignee_id, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(task.id.as_str())
        .bind(project_id.as_str())
        .bind(task.title)
        .bind(task.status.as_str())
        .bind(task.priority.map(TaskPriority::as_str))
        .bind(task.due_date.map(|d| d.timestamp_millis()))
        .bind(task.assignee_id.map(UserId::as_str))
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    /// タスクの状態を変える（updated_at も進む）
    pub async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tasks SET status = ?1, updated_at_ms = ?2 WHERE id = ?3")
            .bind(status.as_str())
            .bind(now.timestamp_millis())
            .bind(task_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "task",
                id: task_id.to_string(),
            });
        }
        Ok(())
    }

    async fn current_status(&self, report_id: &ReportId) -> Result<Option<ReportStatus>, StoreError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM reports WHERE id = ?1")
            .bind(report_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        status
            .map(|s| s.parse::<ReportStatus>().map_err(corrupt))
            .transpose()
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn find_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, name, owner_id FROM projects WHERE id = ?1 AND deleted_at_ms IS NULL",
        )
        .bind(project_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|row| Project {
            id: ProjectId::new(row.id),
            name: row.name,
            owner_id: UserId::new(row.owner_id),
        }))
    }

    async fn is_member(&self, project_id: &ProjectId, user_id: &UserId) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2)",
        )
        .bind(project_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_tasks_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<TaskSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT t.id, t.status, t.priority, t.due_date_ms, t.updated_at_ms,
                   t.assignee_id, u.name AS assignee_name
            FROM tasks t
            LEFT JOIN users u ON u.id = t.assignee_id
            WHERE t.project_id = ?1
            ORDER BY t.created_at_ms, t.id
            "#,
        )
        .bind(project_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(TaskSnapshot::try_from).collect()
    }

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError> {
        let summary = report
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(corrupt)?;
        sqlx::query(&format!(
            "INSERT INTO reports ({REPORT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(report.id.as_str())
        .bind(report.project_id.as_str())
        .bind(report.user_id.as_str())
        .bind(report.report_type.as_str())
        .bind(report.status.as_str())
        .bind(summary)
        .bind(report.requested_at.timestamp_millis())
        .bind(report.completed_at.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn find_report(&self, report_id: &ReportId) -> Result<Option<Report>, StoreError> {
        sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"
        ))
        .bind(report_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Report::try_from)
        .transpose()
    }

    async fn find_reports_by_project(
        &self,
        project_id: &ProjectId,
        page: Page,
    ) -> Result<Vec<Report>, StoreError> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM reports
            WHERE project_id = ?1
            ORDER BY requested_at_ms DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(project_id.as_str())
        .bind(i64::from(page.take))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Report::try_from).collect()
    }

    async fn update_report_status(
        &self,
        report_id: &ReportId,
        transition: ReportTransition,
    ) -> Result<(), StoreError> {
        let expected = transition.expected();
        let target = transition.target();

        let result = match &transition {
            ReportTransition::Complete {
                summary,
                completed_at,
            } => {
                let summary = serde_json::to_string(summary).map_err(corrupt)?;
                sqlx::query(
                    r#"
                    UPDATE reports SET status = ?1, summary = ?2, completed_at_ms = ?3
                    WHERE id = ?4 AND status = ?5
                    "#,
                )
                .bind(target.as_str())
                .bind(summary)
                .bind(completed_at.timestamp_millis())
                .bind(report_id.as_str())
                .bind(expected.as_str())
                .execute(&self.pool)
                .await
            }
            ReportTransition::StartProcessing | ReportTransition::Fail => {
                sqlx::query("UPDATE reports SET status = ?1 WHERE id = ?2 AND status = ?3")
                    .bind(target.as_str())
                    .bind(report_id.as_str())
                    .bind(expected.as_str())
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(db_error)?;

        if result.rows_affected() > 0 {
            debug!(report_id = %report_id, status = %target, "report status updated");
            return Ok(());
        }

        match self.current_status(report_id).await? {
            None => Err(StoreError::report_not_found(report_id)),
            Some(from) => Err(TransitionError { from, to: target }.into()),
        }
    }

    async fn discard_report(&self, report_id: &ReportId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?1 AND status = ?2")
            .bind(report_id.as_str())
            .bind(ReportStatus::Pending.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    async fn seeded() -> SqliteTaskStore {
        let store = SqliteTaskStore::in_memory().await.unwrap();
        for (id, name) in [("owner", "Olivia"), ("member", "Mika"), ("stranger", "Sam")] {
            store
                .create_user(
                    NewUser {
                        id: &UserId::new(id),
                        email: &format!("{id}@example.com"),
                        name,
                    },
                    now(),
                )
                .await
                .unwrap();
        }
        store
            .create_project(
                NewProject {
                    id: &ProjectId::new("p1"),
                    name: "Launch",
                    description: None,
                    owner_id: &UserId::new("owner"),
                },
                now(),
            )
            .await
            .unwrap();
        store
            .add_member(&ProjectId::new("p1"), &UserId::new("member"), MemberRole::Member, now())
            .await
            .unwrap();
        store
    }

    fn pending(id: &str, minutes: i64) -> Report {
        Report::pending(
            ReportId::new(id),
            ProjectId::new("p1"),
            UserId::new("owner"),
            ReportType::Weekly,
            now() + Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn owner_is_recorded_as_member() {
        let store = seeded().await;
        let p1 = ProjectId::new("p1");

        assert!(store.is_member(&p1, &UserId::new("owner")).await.unwrap());
        assert!(store.is_member(&p1, &UserId::new("member")).await.unwrap());
        assert!(!store.is_member(&p1, &UserId::new("stranger")).await.unwrap());

        let project = store.find_project(&p1).await.unwrap().unwrap();
        assert_eq!(project.owner_id, UserId::new("owner"));
        assert_eq!(project.name, "Launch");
    }

    #[tokio::test]
    async fn soft_deleted_project_is_invisible() {
        let store = seeded().await;
        let p1 = ProjectId::new("p1");
        assert!(store.soft_delete_project(&p1, now()).await.unwrap());
        assert!(store.find_project(&p1).await.unwrap().is_none());
        assert!(!store.soft_delete_project(&p1, now()).await.unwrap());
    }

    #[tokio::test]
    async fn tasks_come_back_with_assignee_names() {
        let store = seeded().await;
        let p1 = ProjectId::new("p1");
        let due = now() - Duration::days(1);
        store
            .create_task(
                &p1,
                NewTask {
                    id: &TaskId::new("t1"),
                    title: "Write docs",
                    status: TaskStatus::InProgress,
                    priority: Some(TaskPriority::High),
                    due_date: Some(due),
                    assignee_id: Some(&UserId::new("member")),
                },
                now(),
            )
            .await
            .unwrap();
        store
            .create_task(
                &p1,
                NewTask {
                    id: &TaskId::new("t2"),
                    title: "Ship",
                    status: TaskStatus::Todo,
                    priority: None,
                    due_date: None,
                    assignee_id: None,
                },
                now(),
            )
            .await
            .unwrap();

        let tasks = store.find_tasks_by_project(&p1).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].status, TaskStatus::InProgress);
        assert_eq!(tasks[0].priority, Some(TaskPriority::High));
        assert_eq!(tasks[0].due_date, Some(due));
        assert_eq!(tasks[0].assignee.as_ref().map(|a| a.name.as_str()), Some("Mika"));
        assert_eq!(tasks[1].assignee, None);

        let later = now() + Duration::hours(1);
        store
            .update_task_status(&TaskId::new("t2"), TaskStatus::Done, later)
            .await
            .unwrap();
        let tasks = store.find_tasks_by_project(&p1).await.unwrap();
        assert_eq!(tasks[1].status, TaskStatus::Done);
        assert_eq!(tasks[1].updated_at, later);
    }

    #[tokio::test]
    async fn unknown_enum_value_is_corrupt() {
        let store = seeded().await;
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, status, created_at_ms, updated_at_ms) VALUES ('t9', 'p1', 'x', 'BLOCKED', 0, 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store
            .find_tasks_by_project(&ProjectId::new("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn report_lifecycle_roundtrip() {
        let store = seeded().await;
        let id = ReportId::new("r1");
        store.insert_report(&pending("r1", 0)).await.unwrap();

        store
            .update_report_status(&id, ReportTransition::StartProcessing)
            .await
            .unwrap();
        let summary = ReportSummary {
            total_tasks: 2,
            generated_at: now(),
            ..Default::default()
        };
        store
            .update_report_status(
                &id,
                ReportTransition::Complete {
                    summary: summary.clone(),
                    completed_at: now() + Duration::seconds(3),
                },
            )
            .await
            .unwrap();

        let report = store.find_report(&id).await.unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.summary, Some(summary));
        assert_eq!(report.completed_at, Some(now() + Duration::seconds(3)));

        // 終端状態からは動かない
        let err = store
            .update_report_status(&id, ReportTransition::Fail)
            .await
            .unwrap_err();
        match err {
            StoreError::InvalidTransition(e) => {
                assert_eq!(e.from, ReportStatus::Completed);
                assert_eq!(e.to, ReportStatus::Failed);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_report_update_is_not_found() {
        let store = seeded().await;
        let err = store
            .update_report_status(&ReportId::new("ghost"), ReportTransition::StartProcessing)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn reports_page_newest_first() {
        let store = seeded().await;
        for (id, minutes) in [("r1", 0), ("r2", 2), ("r3", 1)] {
            store.insert_report(&pending(id, minutes)).await.unwrap();
        }

        let first = store
            .find_reports_by_project(&ProjectId::new("p1"), Page::new(0, 2))
            .await
            .unwrap();
        let ids: Vec<_> = first.iter().map(|r| r.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);

        let rest = store
            .find_reports_by_project(&ProjectId::new("p1"), Page::new(2, 10))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id.as_str(), "r1");
    }

    #[tokio::test]
    async fn discard_only_touches_pending_rows() {
        let store = seeded().await;
        store.insert_report(&pending("r1", 0)).await.unwrap();
        store.insert_report(&pending("r2", 0)).await.unwrap();
        store
            .update_report_status(&ReportId::new("r2"), ReportTransition::StartProcessing)
            .await
            .unwrap();

        assert!(store.discard_report(&ReportId::new("r1")).await.unwrap());
        assert!(!store.discard_report(&ReportId::new("r2")).await.unwrap());
        assert!(store.find_report(&ReportId::new("r1")).await.unwrap().is_none());
    }
}
