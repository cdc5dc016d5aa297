use chrono::{Duration, Utc};

use trackr_api::{Claims, JwtKeys};
use trackr_core::domain::UserId;

use crate::settings::Settings;

/// 開発用: ユーザーの bearer token を発行して標準出力に書く
pub fn run(
    settings: &Settings,
    user_id: &str,
    email: &str,
    name: &str,
    ttl_hours: i64,
) -> anyhow::Result<()> {
    let keys = JwtKeys::new(settings.jwt_secret()?.as_bytes());
    let claims = Claims::new(
        UserId::new(user_id),
        email,
        name,
        Utc::now(),
        Duration::hours(ttl_hours),
    );
    println!("{}", keys.issue(&claims)?);
    Ok(())
}
