//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - グローバルなしの依存注入（接続はプロセスが作って渡す）

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::impls::NoopSummaryCache;
use crate::ports::{Clock, IdGenerator, ReportQueue, SummaryCache, SystemClock, TaskStore, UlidGenerator};

use super::dispatcher::DispatcherGroup;
use super::report_service::ReportService;
use super::worker::ReportWorker;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .with_store(store)
///     .with_queue(queue)
///     .with_cache(cache)
///     .build()?;
/// let group = app.spawn_dispatchers(2);
/// ```
///
/// # Fail-fast 設計
/// - store と queue は必須。cache / clock / id 生成は省略可
/// - build() 時に不足と設定値の矛盾をまとめて BuildError にする
#[derive(Default)]
pub struct AppBuilder {
    store: Option<Arc<dyn TaskStore>>,
    queue: Option<Arc<dyn ReportQueue>>,
    cache: Option<Arc<dyn SummaryCache>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: PipelineConfig,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These must be provided before build().")]
    MissingComponents(Vec<&'static str>),

    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_queue(mut self, queue: Arc<dyn ReportQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// 省略時は NoopSummaryCache（毎回集計する）
    pub fn with_cache(mut self, cache: Arc<dyn SummaryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 省略時は SystemClock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 省略時は clock を使う UlidGenerator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let mut missing = Vec::new();
        if self.store.is_none() {
            missing.push("store");
        }
        if self.queue.is_none() {
            missing.push("queue");
        }
        let (Some(store), Some(queue)) = (self.store, self.queue) else {
            return Err(BuildError::MissingComponents(missing));
        };

        if self.config.dequeue_timeout.is_zero() {
            return Err(BuildError::InvalidConfig(
                "dequeue_timeout must be greater than zero".to_string(),
            ));
        }
        if self.config.queue_key.trim().is_empty() {
            return Err(BuildError::InvalidConfig("queue_key must not be empty".to_string()));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let cache = self.cache.unwrap_or_else(|| Arc::new(NoopSummaryCache));

        let report_service = Arc::new(ReportService::new(
            store.clone(),
            queue.clone(),
            cache,
            clock.clone(),
            ids,
            self.config.clone(),
        ));
        let worker = ReportWorker::new(store, clock);

        Ok(App {
            report_service,
            worker,
            queue,
            config: self.config,
        })
    }
}

/// App は組み立て済みのパイプライン
pub struct App {
    pub report_service: Arc<ReportService>,
    pub worker: ReportWorker,
    pub queue: Arc<dyn ReportQueue>,
    pub config: PipelineConfig,
}

impl App {
    /// `n` 個の dispatcher を起動
    pub fn spawn_dispatchers(&self, n: usize) -> DispatcherGroup {
        DispatcherGroup::spawn(n, self.queue.clone(), self.worker.clone(), &self.config)
    }
}
