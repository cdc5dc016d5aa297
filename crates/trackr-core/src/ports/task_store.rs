//! TaskStore port - 正本（source of truth）
//!
//! TaskStore は以下を管理します：
//! - プロジェクトとメンバーシップ（認可判定）
//! - タスク（レポート集計の入力）
//! - レポート（状態と集計結果）
//!
//! # 実装
//! - `impls::InMemoryTaskStore`（テスト・開発用）
//! - `trackr-sqlite` クレートの SqliteTaskStore

use async_trait::async_trait;

use crate::domain::errors::{ErrorKind, TransitionError};
use crate::domain::ids::{ProjectId, ReportId, UserId};
use crate::domain::report::{Page, Report, ReportTransition};
use crate::domain::task::{Project, TaskSnapshot};

/// TaskStore は状態の正本
///
/// # 設計原則
/// - レポートの状態遷移は 1 回の条件付き書き込み（現在の状態を条件にした compare-and-set）
/// - 終端状態（COMPLETED / FAILED）のレポートは二度と書き換えない
/// - ワーカーは ID しか持っていないので、読み取りは全て ID 起点
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// 論理削除されていないプロジェクトを取得
    async fn find_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError>;

    /// メンバーとして登録されているか（オーナーかどうかは見ない）
    async fn is_member(&self, project_id: &ProjectId, user_id: &UserId) -> Result<bool, StoreError>;

    /// プロジェクトの全タスク（担当者名つき）
    async fn find_tasks_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<TaskSnapshot>, StoreError>;

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError>;

    async fn find_report(&self, report_id: &ReportId) -> Result<Option<Report>, StoreError>;

    /// requested_at の新しい順
    async fn find_reports_by_project(
        &self,
        project_id: &ProjectId,
        page: Page,
    ) -> Result<Vec<Report>, StoreError>;

    /// 状態遷移を 1 回の条件付き書き込みで適用
    ///
    /// # Errors
    /// - 行がない: `StoreError::NotFound`
    /// - 期待した状態にない: `StoreError::InvalidTransition`
    async fn update_report_status(
        &self,
        report_id: &ReportId,
        transition: ReportTransition,
    ) -> Result<(), StoreError>;

    /// まだ PENDING のレポートを削除する（enqueue 失敗時の補償）
    ///
    /// 削除できたら true。すでにワーカーが拾っていた場合は false。
    async fn discard_report(&self, report_id: &ReportId) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// 行の中身が想定外（未知の enum 文字列など）
    #[error("unexpected data shape: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn report_not_found(report_id: &ReportId) -> Self {
        StoreError::NotFound {
            kind: "report",
            id: report_id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } | StoreError::InvalidTransition(_) => ErrorKind::Permanent,
            StoreError::Corrupt(_) => ErrorKind::Permanent,
            StoreError::Unavailable(_) => ErrorKind::Infrastructure,
        }
    }
}
