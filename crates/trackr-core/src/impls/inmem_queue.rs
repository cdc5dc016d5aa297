//! InMemoryReportQueue - 開発・テスト用の配送キュー
//!
//! # 学習ポイント
//! - Mutex + Condvar による blocking pop
//! - Async での blocking 処理の扱い（spawn_blocking）

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::job::ReportJob;
use crate::ports::{QueueError, ReportQueue};

/// InMemoryReportQueue はプロセス内の FIFO
///
/// # 実装詳細
/// - VecDeque を Mutex で排他制御（pop_front がそのままアトミックな取り出しになる）
/// - Condvar で push 時に待機中の pop を起こす
pub struct InMemoryReportQueue {
    jobs: Arc<Mutex<VecDeque<ReportJob>>>,
    condvar: Arc<Condvar>,
}

impl InMemoryReportQueue {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(VecDeque::new())),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// 積まれているジョブ数
    pub fn len(&self) -> usize {
        lock(&self.jobs).map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryReportQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(jobs: &Mutex<VecDeque<ReportJob>>) -> Result<MutexGuard<'_, VecDeque<ReportJob>>, QueueError> {
    jobs.lock()
        .map_err(|_| QueueError::OperationFailed("queue lock poisoned".to_string()))
}

#[async_trait]
impl ReportQueue for InMemoryReportQueue {
    async fn push(&self, job: &ReportJob) -> Result<(), QueueError> {
        let jobs = self.jobs.clone();
        let condvar = self.condvar.clone();
        let job = job.clone();

        // spawn_blocking で同期処理を実行（async context で std の Mutex を待たないため）
        tokio::task::spawn_blocking(move || {
            lock(&jobs)?.push_back(job);
            condvar.notify_one();
            Ok(())
        })
        .await
        .map_err(|e| QueueError::OperationFailed(format!("push failed: {e}")))?
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<ReportJob>, QueueError> {
        let jobs = self.jobs.clone();
        let condvar = self.condvar.clone();

        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let mut guard = lock(&jobs)?;
            loop {
                if let Some(job) = guard.pop_front() {
                    return Ok(Some(job));
                }
                let remaining = timeout.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    return Ok(None);
                }
                let (next, _) = condvar
                    .wait_timeout(guard, remaining)
                    .map_err(|_| QueueError::OperationFailed("queue lock poisoned".to_string()))?;
                guard = next;
            }
        })
        .await
        .map_err(|e| QueueError::OperationFailed(format!("pop failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ProjectId, ReportId};
    use crate::domain::report::ReportType;
    use chrono::Utc;
    use std::collections::HashSet;

    fn job(id: &str) -> ReportJob {
        ReportJob {
            report_id: ReportId::new(id),
            project_id: ProjectId::new("p1"),
            report_type: ReportType::Weekly,
            requested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_push_pop_is_fifo() {
        let queue = InMemoryReportQueue::new();
        queue.push(&job("r1")).await.unwrap();
        queue.push(&job("r2")).await.unwrap();
        assert_eq!(queue.len(), 2);

        let first = queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
        let second = queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(first.report_id.as_str(), "r1");
        assert_eq!(second.report_id.as_str(), "r2");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_pop_timeout() {
        let queue = InMemoryReportQueue::new();
        let start = std::time::Instant::now();
        let popped = queue.pop(Duration::from_millis(300)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn test_push_wakes_pop() {
        let queue = Arc::new(InMemoryReportQueue::new());

        let pop_future = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop(Duration::from_secs(5)).await.unwrap() }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        queue.push(&job("r1")).await.unwrap();

        let popped = pop_future.await.unwrap();
        assert_eq!(popped.map(|j| j.report_id), Some(ReportId::new("r1")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pops_never_share_a_job() {
        let queue = Arc::new(InMemoryReportQueue::new());
        for i in 0..50 {
            queue.push(&job(&format!("r{i}"))).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(job) = queue.pop(Duration::from_millis(100)).await.unwrap() {
                    seen.push(job.report_id);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 50);
        assert_eq!(unique.len(), 50);
    }
}
