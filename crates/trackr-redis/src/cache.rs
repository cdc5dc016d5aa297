//! RedisSummaryCache - GET / SET EX

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use trackr_core::ports::{CacheError, SummaryCache};

fn cache_error(e: redis::RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        CacheError::Unavailable(e.to_string())
    } else {
        CacheError::OperationFailed(e.to_string())
    }
}

#[derive(Clone)]
pub struct RedisSummaryCache {
    conn: ConnectionManager,
}

impl RedisSummaryCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(cache_error)?;
        let conn = ConnectionManager::new(client).await.map_err(cache_error)?;
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SummaryCache for RedisSummaryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)
    }

    /// TTL は秒単位（最低 1 秒）
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs TRACKR_TEST_REDIS_URL"]
    async fn set_then_get() {
        let Ok(url) = std::env::var("TRACKR_TEST_REDIS_URL") else { return };
        let cache = RedisSummaryCache::connect(&url).await.unwrap();
        let key = format!(
            "trackr:test:cache:{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );

        assert_eq!(cache.get(&key).await.unwrap(), None);
        cache.set(&key, r#"{"total":1}"#, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some(r#"{"total":1}"#));
    }
}
