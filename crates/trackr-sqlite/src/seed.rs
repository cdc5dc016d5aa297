//! JSON fixture seeding.
//!
//! ```json
//! {
//!   "users": [{"id": "u1", "email": "a@example.com", "name": "Alice"}],
//!   "projects": [{
//!     "id": "p1", "name": "Launch", "owner": "u1", "members": ["u2"],
//!     "tasks": [{"id": "t1", "title": "Docs", "status": "DONE", "priority": "HIGH"}]
//!   }]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use trackr_core::domain::{ProjectId, TaskId, TaskPriority, TaskStatus, UserId};
use trackr_core::ports::StoreError;

use crate::store::{MemberRole, NewProject, NewTask, NewUser, SqliteTaskStore};

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub projects: Vec<ProjectFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFixture {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: UserId,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default)]
    pub tasks: Vec<TaskFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFixture {
    pub id: TaskId,
    pub title: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<UserId>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Todo
}

/// 投入した件数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedCounts {
    pub users: usize,
    pub projects: usize,
    pub members: usize,
    pub tasks: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Fixture {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// fixture を順番に投入する（users → projects → members → tasks）
pub async fn seed(
    store: &SqliteTaskStore,
    fixture: &Fixture,
    now: DateTime<Utc>,
) -> Result<SeedCounts, SeedError> {
    let mut counts = SeedCounts::default();

    for user in &fixture.users {
        store
            .create_user(
                NewUser {
                    id: &user.id,
                    email: &user.email,
                    name: &user.name,
                },
                now,
            )
            .await?;
        counts.users += 1;
    }

    for project in &fixture.projects {
        store
            .create_project(
                NewProject {
                    id: &project.id,
                    name: &project.name,
                    description: project.description.as_deref(),
                    owner_id: &project.owner,
                },
                now,
            )
            .await?;
        counts.projects += 1;

        for member in &project.members {
            store
                .add_member(&project.id, member, MemberRole::Member, now)
                .await?;
            counts.members += 1;
        }

        for task in &project.tasks {
            store
                .create_task(
                    &project.id,
                    NewTask {
                        id: &task.id,
                        title: &task.title,
                        status: task.status,
                        priority: task.priority,
                        due_date: task.due_date,
                        assignee_id: task.assignee.as_ref(),
                    },
                    now,
                )
                .await?;
            counts.tasks += 1;
        }
    }

    info!(
        users = counts.users,
        projects = counts.projects,
        members = counts.members,
        tasks = counts.tasks,
        "fixture seeded"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackr_core::ports::TaskStore;

    const FIXTURE: &str = r#"{
        "users": [
            {"id": "u1", "email": "alice@example.com", "name": "Alice"},
            {"id": "u2", "email": "bob@example.com", "name": "Bob"}
        ],
        "projects": [{
            "id": "p1",
            "name": "Launch",
            "owner": "u1",
            "members": ["u2"],
            "tasks": [
                {"id": "t1", "title": "Docs", "status": "DONE", "priority": "HIGH", "assignee": "u2"},
                {"id": "t2", "title": "Ship", "dueDate": "2024-01-01T00:00:00Z"}
            ]
        }]
    }"#;

    #[tokio::test]
    async fn seeds_a_fixture() {
        let store = SqliteTaskStore::in_memory().await.unwrap();
        let fixture = Fixture::from_json(FIXTURE).unwrap();
        let counts = seed(&store, &fixture, Utc::now()).await.unwrap();

        assert_eq!(
            counts,
            SeedCounts {
                users: 2,
                projects: 1,
                members: 1,
                tasks: 2
            }
        );

        let p1 = ProjectId::new("p1");
        assert!(store.is_member(&p1, &UserId::new("u1")).await.unwrap());
        assert!(store.is_member(&p1, &UserId::new("u2")).await.unwrap());

        let tasks = store.find_tasks_by_project(&p1).await.unwrap();
        assert_eq!(tasks.len(), 2);
        let t2 = tasks.iter().find(|t| t.id.as_str() == "t2").unwrap();
        assert_eq!(t2.status, TaskStatus::Todo);
        assert!(t2.due_date.is_some());
    }

    #[test]
    fn rejects_unknown_status() {
        let raw = r#"{"projects": [{"id": "p1", "name": "x", "owner": "u1",
            "tasks": [{"id": "t1", "title": "x", "status": "BLOCKED"}]}]}"#;
        assert!(matches!(Fixture::from_json(raw), Err(SeedError::Parse(_))));
    }
}
