//! RedisReportQueue - LPUSH で積んで BRPOP で取り出す
//!
//! # 接続
//! - push は ConnectionManager（自動再接続）を共有する
//! - BRPOP はサーバー側で接続ごとブロックするので、pop ごとに専用の接続を
//!   小さなプールから借りる。エラーになった接続はプールに戻さない

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use trackr_core::domain::ReportJob;
use trackr_core::ports::{QueueError, ReportQueue};

pub(crate) fn queue_error(e: redis::RedisError) -> QueueError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        QueueError::Unavailable(e.to_string())
    } else {
        QueueError::OperationFailed(e.to_string())
    }
}

pub struct RedisReportQueue {
    client: redis::Client,
    writer: ConnectionManager,
    idle: Mutex<Vec<MultiplexedConnection>>,
    key: String,
}

impl RedisReportQueue {
    pub async fn connect(url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(url).map_err(queue_error)?;
        let writer = ConnectionManager::new(client.clone())
            .await
            .map_err(queue_error)?;
        Ok(Self {
            client,
            writer,
            idle: Mutex::new(Vec::new()),
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn checkout(&self) -> Result<MultiplexedConnection, QueueError> {
        if let Some(conn) = self.idle.lock().await.pop() {
            return Ok(conn);
        }
        debug!(key = %self.key, "opening blocking-pop connection");
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(queue_error)
    }

    async fn checkin(&self, conn: MultiplexedConnection) {
        self.idle.lock().await.push(conn);
    }
}

/// BRPOP の timeout は整数秒（0 は無期限）なので、端数は切り上げて最低 1 秒にする
fn brpop_timeout_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl ReportQueue for RedisReportQueue {
    async fn push(&self, job: &ReportJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.writer.clone();
        let _len: i64 = redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(queue_error)?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<ReportJob>, QueueError> {
        let mut conn = self.checkout().await?;
        let secs = brpop_timeout_secs(timeout);

        let popped: Option<(String, String)> = match redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(secs)
            .query_async(&mut conn)
            .await
        {
            Ok(popped) => popped,
            Err(e) => {
                warn!(key = %self.key, error = %e, "BRPOP failed, dropping connection");
                return Err(queue_error(e));
            }
        };
        self.checkin(conn).await;

        match popped {
            Some((_key, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}
