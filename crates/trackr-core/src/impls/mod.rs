//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の in-memory 実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryReportQueue**: プロセス内の配送キュー
//! - **InMemoryTaskStore**: テスト用の正本
//! - **InMemorySummaryCache** / **NoopSummaryCache**: サマリーキャッシュ
//!
//! # 本番用実装
//! 本番用の実装は別クレートに配置します：
//! - `trackr-sqlite`: SqliteTaskStore
//! - `trackr-redis`: RedisReportQueue / RedisSummaryCache

pub mod inmem_cache;
pub mod inmem_queue;
pub mod inmem_store;

pub use self::inmem_cache::{InMemorySummaryCache, NoopSummaryCache};
pub use self::inmem_queue::InMemoryReportQueue;
pub use self::inmem_store::InMemoryTaskStore;
