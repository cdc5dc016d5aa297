//! ReportWorker - ジョブ 1 つを隔離して処理する
//!
//! # 流れ
//! 1. PENDING → PROCESSING（行がない・すでに進んでいるならスキップ）
//! 2. プロジェクトのタスクを取得
//! 3. blocking pool で集計
//! 4. PROCESSING → COMPLETED（summary と completed_at を書く）
//!
//! 2〜4 のどこで失敗しても PROCESSING → FAILED をベストエフォートで書き、
//! 結果は 1 通の `WorkerMessage` で dispatcher に返す。

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::domain::ids::ReportId;
use crate::domain::job::ReportJob;
use crate::domain::report::ReportTransition;
use crate::domain::summary::ReportSummary;
use crate::ports::{Clock, StoreError, TaskStore};

/// ワーカーから dispatcher への唯一のメッセージ
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Completed {
        report_id: ReportId,
        summary: ReportSummary,
    },
    /// 行が消えていた、または別のワーカーがすでに処理した
    Skipped { report_id: ReportId, reason: String },
    Failed { report_id: ReportId, error: String },
}

impl WorkerMessage {
    pub fn report_id(&self) -> &ReportId {
        match self {
            WorkerMessage::Completed { report_id, .. }
            | WorkerMessage::Skipped { report_id, .. }
            | WorkerMessage::Failed { report_id, .. } => report_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("summary computation aborted: {0}")]
    Compute(String),
}

#[derive(Clone)]
pub struct ReportWorker {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl ReportWorker {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 別タスクで処理を始め、結果の受け口を返す
    ///
    /// タスクが panic した場合は Sender が落ちるので、受け側は `RecvError` を受け取る。
    pub fn launch(&self, job: ReportJob) -> oneshot::Receiver<WorkerMessage> {
        let (tx, rx) = oneshot::channel();
        let worker = self.clone();
        tokio::spawn(async move {
            let message = worker.process(job).await;
            // 受け側が先に諦めていても構わない
            let _ = tx.send(message);
        });
        rx
    }

    /// ジョブを 1 つ処理する（launch を経由しない同期的な入口）
    pub async fn process(&self, job: ReportJob) -> WorkerMessage {
        let report_id = job.report_id.clone();
        info!(report_id = %report_id, project_id = %job.project_id, "processing report");

        match self
            .store
            .update_report_status(&report_id, ReportTransition::StartProcessing)
            .await
        {
            Ok(()) => {}
            Err(e @ (StoreError::NotFound { .. } | StoreError::InvalidTransition(_))) => {
                warn!(report_id = %report_id, reason = %e, "skipping report job");
                return WorkerMessage::Skipped {
                    report_id,
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                // PENDING のままなので FAILED には遷移できない
                error!(report_id = %report_id, error = %e, "could not start report");
                return WorkerMessage::Failed {
                    report_id,
                    error: e.to_string(),
                };
            }
        }

        match self.run(&job).await {
            Ok(summary) => {
                info!(
                    report_id = %report_id,
                    total_tasks = summary.total_tasks,
                    completed_tasks = summary.completed_tasks,
                    overdue_tasks = summary.overdue_tasks,
                    "report generated (notification would be sent here)"
                );
                WorkerMessage::Completed { report_id, summary }
            }
            Err(e) => {
                error!(report_id = %report_id, error = %e, "error processing report");
                self.mark_failed(&report_id).await;
                WorkerMessage::Failed {
                    report_id,
                    error: e.to_string(),
                }
            }
        }
    }

    /// PROCESSING → FAILED をベストエフォートで書く（失敗してもログだけ）
    pub async fn mark_failed(&self, report_id: &ReportId) {
        if let Err(e) = self
            .store
            .update_report_status(report_id, ReportTransition::Fail)
            .await
        {
            error!(report_id = %report_id, error = %e, "could not mark report as failed");
        }
    }

    async fn run(&self, job: &ReportJob) -> Result<ReportSummary, WorkerError> {
        let tasks = self.store.find_tasks_by_project(&job.project_id).await?;
        let now = self.clock.now();

        let summary = tokio::task::spawn_blocking(move || ReportSummary::compute(&tasks, now))
            .await
            .map_err(|e| WorkerError::Compute(e.to_string()))?;

        self.store
            .update_report_status(
                &job.report_id,
                ReportTransition::Complete {
                    summary: summary.clone(),
                    completed_at: self.clock.now(),
                },
            )
            .await?;
        Ok(summary)
    }
}
