//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（SQLite, Redis など）へのインターフェースを提供し、
//! 実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - TaskStore が source of truth（正本）
//! - Redis は配送キュー（ReportJob の JSON）とサマリーキャッシュ
//! - 接続のライフサイクルはプロセスが持ち、起動時に注入する（グローバルなし）

pub mod clock;
pub mod id_generator;
pub mod report_queue;
pub mod summary_cache;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::report_queue::{QueueError, ReportQueue};
pub use self::summary_cache::{CacheError, SummaryCache, summary_key};
pub use self::task_store::{StoreError, TaskStore};
