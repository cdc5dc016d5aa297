//! ReportService - 認可ゲート、レポート作成と enqueue、サマリーの読み取り
//!
//! # 学習ポイント
//! - ports だけに依存する（SQLite も Redis も知らない）
//! - enqueue 失敗時の補償（PENDING のまま残った行を消す）
//! - キャッシュはベストエフォート（壊れていたら再計算に落ちる）

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::domain::errors::ErrorKind;
use crate::domain::ids::{ProjectId, ReportId, UserId};
use crate::domain::job::ReportJob;
use crate::domain::report::{Page, Report, ReportType};
use crate::domain::summary::ProjectSummary;
use crate::ports::{
    Clock, IdGenerator, QueueError, ReportQueue, StoreError, SummaryCache, TaskStore, summary_key,
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// enqueue に失敗した。レポートは作られていないので、そのまま再送してよい
    #[error("report queue unavailable, retry later")]
    QueueUnavailable(#[source] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Forbidden(_) | ServiceError::NotFound(_) | ServiceError::Validation(_) => {
                ErrorKind::Permanent
            }
            ServiceError::QueueUnavailable(_) => ErrorKind::Transient,
            ServiceError::Store(e) => e.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// ReportService はクライアント側の入口
pub struct ReportService {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn ReportQueue>,
    cache: Arc<dyn SummaryCache>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: PipelineConfig,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn ReportQueue>,
        cache: Arc<dyn SummaryCache>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            queue,
            cache,
            clock,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// PENDING のレポートを作り、ジョブを 1 つ積んで即座に返す
    ///
    /// # Errors
    /// - オーナーでもメンバーでもない: `Forbidden`
    /// - キューに積めなかった: `QueueUnavailable`（作った行は補償で消す）
    pub async fn create(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        report_type: ReportType,
    ) -> Result<Report, ServiceError> {
        self.authorize(project_id, user_id, "project").await?;

        let report = Report::pending(
            self.ids.generate_report_id(),
            project_id.clone(),
            user_id.clone(),
            report_type,
            self.clock.now(),
        );
        self.store.insert_report(&report).await?;

        let job = ReportJob::from(&report);
        if let Err(err) = self.queue.push(&job).await {
            return self.compensate(report, err).await;
        }

        info!(
            report_id = %report.id,
            project_id = %report.project_id,
            report_type = %report.report_type,
            "report enqueued"
        );
        Ok(report)
    }

    /// push が失敗したときの後始末
    async fn compensate(&self, report: Report, err: QueueError) -> Result<Report, ServiceError> {
        warn!(report_id = %report.id, error = %err, "enqueue failed, discarding pending report");

        match self.store.discard_report(&report.id).await {
            Ok(true) => Err(ServiceError::QueueUnavailable(err)),
            Ok(false) => {
                // 行が PENDING を抜けている = ジョブは実際には届いていた
                info!(report_id = %report.id, "report already picked up despite enqueue error");
                match self.store.find_report(&report.id).await? {
                    Some(current) => Ok(current),
                    None => Err(ServiceError::QueueUnavailable(err)),
                }
            }
            Err(discard_err) => {
                error!(
                    report_id = %report.id,
                    error = %discard_err,
                    "failed to discard pending report after enqueue failure"
                );
                Err(ServiceError::QueueUnavailable(err))
            }
        }
    }

    /// # Errors
    /// - 存在しない: `NotFound`（認可より先に判定）
    pub async fn find_by_id(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Report, ServiceError> {
        let report = self
            .store
            .find_report(report_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Report not found".to_string()))?;

        self.authorize(&report.project_id, user_id, "report").await?;
        Ok(report)
    }

    /// 新しい順、skip/take でページング（take 0 は config の default_page_size）
    pub async fn find_by_project(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        page: Page,
    ) -> Result<Vec<Report>, ServiceError> {
        self.authorize(project_id, user_id, "project").await?;
        let page = page.or_take(self.config.default_page_size);
        Ok(self.store.find_reports_by_project(project_id, page).await?)
    }

    /// キャッシュ優先の read-through
    ///
    /// ヒットならそのまま返す。ミスなら集計して TTL つきで書き戻す。
    /// 同時に来たミスはそれぞれ集計する（single-flight はしない）。
    pub async fn get_project_summary(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<ProjectSummary, ServiceError> {
        self.authorize(project_id, user_id, "project").await?;

        let key = summary_key(project_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<ProjectSummary>(&raw) {
                Ok(summary) => {
                    debug!(project_id = %project_id, "summary cache hit");
                    return Ok(summary);
                }
                Err(e) => warn!(key = %key, error = %e, "ignoring unparsable cached summary"),
            },
            Ok(None) => debug!(project_id = %project_id, "summary cache miss"),
            Err(e) => warn!(key = %key, error = %e, "summary cache read failed, recomputing"),
        }

        let tasks = self.store.find_tasks_by_project(project_id).await?;
        let summary = ProjectSummary::compute(&tasks, self.clock.now());

        match serde_json::to_string(&summary) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(&key, &raw, self.config.summary_ttl).await {
                    warn!(key = %key, error = %e, "summary cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "failed to encode summary for cache"),
        }

        Ok(summary)
    }

    /// オーナーかメンバーなら通す。プロジェクトがなければ Forbidden
    async fn authorize(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        subject: &str,
    ) -> Result<(), ServiceError> {
        let forbidden = || ServiceError::Forbidden(format!("You do not have access to this {subject}"));

        let Some(project) = self.store.find_project(project_id).await? else {
            return Err(forbidden());
        };
        if project.is_owned_by(user_id) || self.store.is_member(project_id, user_id).await? {
            Ok(())
        } else {
            Err(forbidden())
        }
    }
}
