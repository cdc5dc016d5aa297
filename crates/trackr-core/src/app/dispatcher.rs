//! Dispatcher - Queue → Worker をつなぐループ
//!
//! 1 つの dispatcher は 1 度に 1 ジョブだけ処理する。並列度を上げたいときは
//! `DispatcherGroup::spawn(n)` で数を増やすか、プロセスを増やす。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::observability::{DispatcherCounts, DispatcherStats};
use crate::ports::ReportQueue;

use super::worker::{ReportWorker, WorkerMessage};

/// Dispatcher group handle.
/// - `request_shutdown()` で全 dispatcher が次の pop をやめる
/// - `shutdown_and_join()` で全 dispatcher の終了を待てる
///
/// 処理中のジョブは shutdown 時に見捨てることがある（レポートは PROCESSING のまま残りうる）。
pub struct DispatcherGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    stats: Arc<DispatcherStats>,
}

#[derive(Clone)]
struct LoopSettings {
    dequeue_timeout: Duration,
    error_backoff: Duration,
}

impl DispatcherGroup {
    /// Spawn `n` dispatchers.
    pub fn spawn(
        n: usize,
        queue: Arc<dyn ReportQueue>,
        worker: ReportWorker,
        config: &PipelineConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(DispatcherStats::new());
        let settings = LoopSettings {
            dequeue_timeout: config.dequeue_timeout,
            error_backoff: config.error_backoff,
        };

        let mut joins = Vec::with_capacity(n);
        for dispatcher_id in 0..n {
            let q = Arc::clone(&queue);
            let w = worker.clone();
            let s = Arc::clone(&stats);
            let settings = settings.clone();
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                info!(dispatcher = dispatcher_id, "dispatcher started");
                dispatcher_loop(dispatcher_id, q, w, s, settings, &mut rx).await;
                info!(dispatcher = dispatcher_id, "dispatcher stopped");
            });
            joins.push(join);
        }

        Self {
            shutdown_tx,
            joins,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn stats(&self) -> Arc<DispatcherStats> {
        Arc::clone(&self.stats)
    }

    /// Request shutdown for all dispatchers.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all dispatchers. 最後のカウンタを返す
    pub async fn shutdown_and_join(self) -> DispatcherCounts {
        self.request_shutdown();
        for j in self.joins {
            if let Err(e) = j.await {
                error!(error = %e, "dispatcher task ended abnormally");
            }
        }
        let counts = self.stats.snapshot();
        info!(
            received = counts.received,
            completed = counts.completed,
            failed = counts.failed,
            skipped = counts.skipped,
            queue_errors = counts.queue_errors,
            "dispatchers shut down"
        );
        counts
    }
}

async fn dispatcher_loop(
    dispatcher_id: usize,
    queue: Arc<dyn ReportQueue>,
    worker: ReportWorker,
    stats: Arc<DispatcherStats>,
    settings: LoopSettings,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は select で打ち切らない。timeout ごとに戻ってきて shutdown を確認する。
        let job = match queue.pop(settings.dequeue_timeout).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                stats.record_queue_error();
                if e.kind().is_retryable() {
                    warn!(dispatcher = dispatcher_id, error = %e, "queue error, backing off");
                    tokio::select! {
                        _ = shutdown_rx.changed() => {}
                        _ = tokio::time::sleep(settings.error_backoff) => {}
                    }
                } else {
                    error!(dispatcher = dispatcher_id, error = %e, "dropping unreadable job");
                }
                continue;
            }
        };

        stats.record_received();
        info!(
            dispatcher = dispatcher_id,
            report_id = %job.report_id,
            project_id = %job.project_id,
            "job received"
        );

        let report_id = job.report_id.clone();
        let rx = worker.launch(job);

        // pop の待ち中に shutdown が来ていた場合、このジョブはもうキューに戻せない。
        // 最後まで処理してから抜ける。
        let stopping = *shutdown_rx.borrow();
        let message = if stopping {
            info!(dispatcher = dispatcher_id, report_id = %report_id, "finishing job taken during shutdown");
            rx.await
        } else {
            tokio::select! {
                message = rx => message,
                _ = shutdown_rx.changed() => {
                    warn!(dispatcher = dispatcher_id, report_id = %report_id, "shutdown requested, abandoning in-flight report");
                    break;
                }
            }
        };

        match message {
            Ok(WorkerMessage::Completed { report_id, .. }) => {
                stats.record_completed();
                info!(dispatcher = dispatcher_id, report_id = %report_id, "report completed");
            }
            Ok(WorkerMessage::Skipped { report_id, reason }) => {
                stats.record_skipped();
                info!(dispatcher = dispatcher_id, report_id = %report_id, reason = %reason, "report skipped");
            }
            Ok(WorkerMessage::Failed { report_id, error }) => {
                stats.record_failed();
                error!(dispatcher = dispatcher_id, report_id = %report_id, error = %error, "report failed");
            }
            Err(_) => {
                error!(dispatcher = dispatcher_id, report_id = %report_id, "worker exited without reporting");
                worker.mark_failed(&report_id).await;
                stats.record_failed();
            }
        }

        if stopping {
            break;
        }
    }
}
