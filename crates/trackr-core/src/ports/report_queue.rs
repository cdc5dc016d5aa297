//! ReportQueue port - レポートジョブの配送キュー（Redis または InMemory）
//!
//! # 実装
//! - `impls::InMemoryReportQueue`（開発・テスト用）
//! - `trackr-redis` クレートの RedisReportQueue（LPUSH + BRPOP）

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::ErrorKind;
use crate::domain::job::ReportJob;

/// ReportQueue は全プロセスで共有する FIFO
///
/// # 設計原則
/// - push は末尾に追加、pop は一番古いジョブを返す
/// - pop はアトミック（同じジョブが 2 つの dispatcher に渡ることはない）
/// - blocking pop（timeout 付き）。timeout は shutdown 判定のためだけにある
/// - ack / 再配送はない（pop 後にワーカーが落ちたジョブは失われる）
#[async_trait]
pub trait ReportQueue: Send + Sync {
    async fn push(&self, job: &ReportJob) -> Result<(), QueueError>;

    /// `timeout` まで待って、空なら `Ok(None)`
    async fn pop(&self, timeout: Duration) -> Result<Option<ReportJob>, QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    #[error("queue operation failed: {0}")]
    OperationFailed(String),

    /// payload が ReportJob として読めない
    #[error("malformed job payload: {0}")]
    Codec(#[from] serde_json::Error),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Unavailable(_) | QueueError::OperationFailed(_) => ErrorKind::Transient,
            QueueError::Codec(_) => ErrorKind::Permanent,
        }
    }
}
