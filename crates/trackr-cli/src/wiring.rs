//! 本番用の ports（SQLite + Redis）を組み立てる

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use trackr_core::{App, AppBuilder};
use trackr_redis::{RedisReportQueue, RedisSummaryCache};
use trackr_sqlite::SqliteTaskStore;

use crate::settings::Settings;

pub async fn build_app(settings: &Settings) -> anyhow::Result<App> {
    let config = settings.pipeline_config();

    let store = SqliteTaskStore::connect(&settings.database_url)
        .await
        .with_context(|| format!("failed to open task store at {}", settings.database_url))?;
    let queue = RedisReportQueue::connect(&settings.redis_url, config.queue_key.clone())
        .await
        .with_context(|| format!("failed to connect report queue at {}", settings.redis_url))?;
    let cache = RedisSummaryCache::connect(&settings.redis_url)
        .await
        .with_context(|| format!("failed to connect summary cache at {}", settings.redis_url))?;
    info!(queue_key = %config.queue_key, "ports connected");

    AppBuilder::new()
        .with_store(Arc::new(store))
        .with_queue(Arc::new(queue))
        .with_cache(Arc::new(cache))
        .with_config(config)
        .build()
        .context("failed to build app")
}
