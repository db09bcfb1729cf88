//! CLI `splash` command: splash analysis for a stored memory.

use anyhow::{Context, Result};

use crate::config::CairnConfig;
use crate::memory::store::get_memory;
use crate::memory::types::EmbeddingKind;
use crate::splash::{format_splash_output, SplashEngine, SplashQuery};

/// Compare a stored memory against the rest of the store.
pub async fn splash(
    config: &CairnConfig,
    id: &str,
    mode: Option<&str>,
    count: Option<usize>,
) -> Result<()> {
    let mode: EmbeddingKind = mode
        .unwrap_or(&config.splash.mode)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let count = count.unwrap_or(config.splash.count);
    let config = config.clone();
    let id = id.to_string();

    let output = tokio::task::spawn_blocking(move || -> Result<String> {
        let conn = crate::db::open_database(config.resolved_db_path(), &config.embedding)?;
        let memory = get_memory(&conn, &id)?
            .with_context(|| format!("memory not found: {id}"))?;

        let engine = SplashEngine::new(&conn).with_preview_chars(config.splash.preview_chars);
        let analysis =
            engine.generate_splash(&SplashQuery::from_memory(&memory), mode, Some(id.as_str()), count)?;
        Ok(format_splash_output(&analysis))
    })
    .await??;

    println!("{output}");
    Ok(())
}
