pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::config::EmbeddingConfig;

/// Open (or create) the memory database at the given path, with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>, embedding: &EmbeddingConfig) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    prepare(&conn, embedding)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database(embedding: &EmbeddingConfig) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&conn, embedding)?;
    Ok(conn)
}

fn prepare(conn: &Connection, embedding: &EmbeddingConfig) -> Result<()> {
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn, embedding).context("failed to run migrations")?;
    migrations::check_embedding_dims(conn, embedding)
        .context("failed to read embedding dimensions")?;
    Ok(())
}
