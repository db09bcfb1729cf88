//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::Connection;

use crate::config::EmbeddingConfig;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

fn get_meta_usize(conn: &Connection, key: &str) -> rusqlite::Result<Option<usize>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(val.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The stored `(semantic_dim, emotional_dim)` pair, if recorded.
pub fn get_embedding_dims(conn: &Connection) -> rusqlite::Result<Option<(usize, usize)>> {
    let semantic = get_meta_usize(conn, "semantic_dim")?;
    let emotional = get_meta_usize(conn, "emotional_dim")?;
    Ok(semantic.zip(emotional))
}

/// Overwrite the stored embedding dimensions.
pub fn set_embedding_dims(conn: &Connection, semantic: usize, emotional: usize) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('semantic_dim', ?1)",
        [semantic.to_string()],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('emotional_dim', ?1)",
        [emotional.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection, embedding: &EmbeddingConfig) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn, embedding)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Warn when the stored embedding dimensions differ from the configured ones.
///
/// Returns `true` when they match or nothing is recorded yet.
pub fn check_embedding_dims(conn: &Connection, embedding: &EmbeddingConfig) -> rusqlite::Result<bool> {
    match get_embedding_dims(conn)? {
        Some((semantic, emotional))
            if semantic != embedding.semantic_dim || emotional != embedding.emotional_dim =>
        {
            tracing::warn!(
                stored_semantic = semantic,
                stored_emotional = emotional,
                configured_semantic = embedding.semantic_dim,
                configured_emotional = embedding.emotional_dim,
                "embedding dimensions differ from the database"
            );
            Ok(false)
        }
        _ => Ok(true),
    }
}

/// Migration v1 → v2: record embedding dimensions in schema_meta.
///
/// Dimensions already present in stored rows win over the configured ones.
fn migrate_v1_to_v2(conn: &Connection, embedding: &EmbeddingConfig) -> rusqlite::Result<()> {
    let stored_width = |column: &str| -> rusqlite::Result<Option<usize>> {
        let sql = format!(
            "SELECT length({column}) FROM memories WHERE {column} IS NOT NULL LIMIT 1"
        );
        match conn.query_row(&sql, [], |row| row.get::<_, i64>(0)) {
            Ok(bytes) => Ok(Some(bytes as usize / std::mem::size_of::<f32>())),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    };
    let semantic = stored_width("semantic_embedding")?.unwrap_or(embedding.semantic_dim);
    let emotional = stored_width("emotional_embedding")?.unwrap_or(embedding.emotional_dim);

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('semantic_dim', ?1)",
        [semantic.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('emotional_dim', ?1)",
        [emotional.to_string()],
    )?;
    Ok(())
}
