use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use trackr_api::{ApiState, JwtKeys, router_with_prefix};

use crate::settings::Settings;
use crate::{shutdown, wiring};

/// HTTP サーバーを起動する。`embedded_worker` なら dispatcher も同じプロセスで回す
pub async fn run(settings: &Settings, embedded_worker: bool) -> anyhow::Result<()> {
    let keys = JwtKeys::new(settings.jwt_secret()?.as_bytes());
    let app = wiring::build_app(settings).await?;

    let dispatchers = embedded_worker.then(|| app.spawn_dispatchers(app.config.dispatchers));
    if let Some(group) = &dispatchers {
        info!(dispatchers = group.len(), "embedded worker started");
    }

    let state = Arc::new(ApiState::new(app.report_service.clone(), keys));
    let router = router_with_prefix(state, &settings.api_prefix);

    let listener = TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    info!(addr = %settings.bind, prefix = %settings.api_prefix, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = shutdown::wait_for_signal().await {
                error!("Error in signal handling: {}", e);
            }
        })
        .await
        .context("http server failed")?;

    if let Some(group) = dispatchers {
        let counts = group.shutdown_and_join().await;
        info!(?counts, "embedded worker stopped");
    }
    info!("server stopped");
    Ok(())
}
