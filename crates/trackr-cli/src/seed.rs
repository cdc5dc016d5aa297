use std::path::Path;

use anyhow::Context;
use chrono::Utc;

use trackr_sqlite::{Fixture, SqliteTaskStore};

use crate::settings::Settings;

/// fixture を読み込んで SQLite に投入し、件数を JSON で出す
pub async fn run(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let fixture = Fixture::from_json(&raw)
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;

    let store = SqliteTaskStore::connect(&settings.database_url)
        .await
        .with_context(|| format!("failed to open task store at {}", settings.database_url))?;
    let counts = trackr_sqlite::seed(&store, &fixture, Utc::now())
        .await
        .context("failed to seed fixture")?;

    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}
