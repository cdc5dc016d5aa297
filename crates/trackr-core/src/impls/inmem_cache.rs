//! In-memory SummaryCache 実装
//!
//! - InMemorySummaryCache: Clock で期限を判定する（FixedClock で TTL を試せる）
//! - NoopSummaryCache: 何も覚えない。キャッシュなしで動かすときの既定値

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::ports::{CacheError, Clock, SummaryCache, SystemClock};

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct InMemorySummaryCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySummaryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemorySummaryCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl SummaryCache for InMemorySummaryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::OperationFailed(format!("ttl out of range: {e}")))?;
        let expires_at = self.clock.now() + ttl;
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// NoopSummaryCache は常にミスする
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSummaryCache;

#[async_trait]
impl SummaryCache for NoopSummaryCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}
