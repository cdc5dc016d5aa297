use tracing::{error, info};

use crate::settings::Settings;
use crate::{shutdown, wiring};

/// dispatcher だけを回すプロセス。シグナルを受けたら止めて集計を出す
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let app = wiring::build_app(settings).await?;
    let group = app.spawn_dispatchers(app.config.dispatchers);
    info!(
        dispatchers = group.len(),
        queue_key = %app.config.queue_key,
        "worker started"
    );

    if let Err(e) = shutdown::wait_for_signal().await {
        error!("Error in signal handling: {}", e);
    }

    let counts = group.shutdown_and_join().await;
    info!(
        received = counts.received,
        completed = counts.completed,
        failed = counts.failed,
        skipped = counts.skipped,
        queue_errors = counts.queue_errors,
        "worker stopped"
    );
    Ok(())
}
