//! trackr-sqlite
//!
//! SQLite による TaskStore 実装（users / projects / members / tasks / reports）。
//!
//! - **store**: SqliteTaskStore と seed 用の書き込みヘルパー
//! - **schema**: テーブル定義とブートストラップ
//! - **seed**: JSON fixture の投入

pub mod schema;
pub mod seed;
pub mod store;

pub use self::seed::{Fixture, SeedCounts, SeedError, seed};
pub use self::store::{MemberRole, NewProject, NewTask, NewUser, SqliteTaskStore};
