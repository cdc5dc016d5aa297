//! trackr-redis
//!
//! Redis を使う ports 実装。
//!
//! - **queue**: RedisReportQueue（`report:queue` リストに LPUSH / BRPOP）
//! - **cache**: RedisSummaryCache（`project:{id}:summary` に GET / SET EX）

pub mod cache;
pub mod queue;

pub use self::cache::RedisSummaryCache;
pub use self::queue::RedisReportQueue;
