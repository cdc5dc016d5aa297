//! Schema bootstrap.
//!
//! タイムスタンプは全て epoch ミリ秒の INTEGER で持つ。
//! enum は wire 表現と同じ大文字の文字列（'PENDING', 'IN_PROGRESS', ...）。

use sqlx::SqlitePool;
use tracing::debug;

pub const CREATE_USERS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL
)
"#;

pub const CREATE_PROJECTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    owner_id TEXT NOT NULL REFERENCES users(id),
    created_at_ms INTEGER NOT NULL,
    deleted_at_ms INTEGER
)
"#;

pub const CREATE_PROJECT_MEMBERS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS project_members (
    project_id TEXT NOT NULL REFERENCES projects(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    role TEXT NOT NULL DEFAULT 'MEMBER',
    joined_at_ms INTEGER NOT NULL,
    PRIMARY KEY (project_id, user_id)
)
"#;

pub const CREATE_TASKS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id),
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'TODO',
    priority TEXT,
    due_date_ms INTEGER,
    assignee_id TEXT REFERENCES users(id),
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
)
"#;

pub const CREATE_REPORTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    report_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    summary TEXT,
    requested_at_ms INTEGER NOT NULL,
    completed_at_ms INTEGER
)
"#;

pub const CREATE_INDEXES_SQL: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_reports_project_requested ON reports(project_id, requested_at_ms DESC)",
];

/// 全テーブルを作る（何度呼んでもよい）
pub async fn apply(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Applying trackr schema");
    for sql in [
        CREATE_USERS_SQL,
        CREATE_PROJECTS_SQL,
        CREATE_PROJECT_MEMBERS_SQL,
        CREATE_TASKS_SQL,
        CREATE_REPORTS_SQL,
    ] {
        sqlx::query(sql).execute(pool).await?;
    }
    for idx in CREATE_INDEXES_SQL {
        sqlx::query(idx).execute(pool).await?;
    }
    Ok(())
}
