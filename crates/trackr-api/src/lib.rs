//! trackr-api
//!
//! レポートパイプラインの HTTP 面（axum）。
//!
//! - **routes**: ルーターとハンドラー
//! - **auth**: Bearer JWT の検証（`AuthUser` extractor）と発行
//! - **error**: ApiError とエラーエンベロープ
//! - **state**: ApiState

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use self::auth::{AuthUser, Claims, JwtKeys, TokenError};
pub use self::error::ApiError;
pub use self::routes::{router, router_with_prefix};
pub use self::state::ApiState;
