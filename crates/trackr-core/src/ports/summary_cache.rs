//! SummaryCache port - TTL つきの key/value
//!
//! ベストエフォート: 失敗したら呼び出し側は再計算に落ちるだけ。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ids::ProjectId;

/// プロジェクトサマリーのキャッシュキー
pub fn summary_key(project_id: &ProjectId) -> String {
    format!("project:{project_id}:summary")
}

#[async_trait]
pub trait SummaryCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation failed: {0}")]
    OperationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert_eq!(summary_key(&ProjectId::new("p1")), "project:p1:summary");
    }
}
