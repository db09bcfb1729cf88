//! Read and write paths for the `memories` table.
//!
//! Also implements [`CorpusSource`] so splash analysis can read stored
//! embeddings straight from a connection.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::{bytes_to_embedding, embedding_to_bytes};
use crate::memory::types::{EmbeddingKind, Memory};
use crate::splash::{CorpusEntry, CorpusSource};

const MEMORY_COLUMNS: &str =
    "id, content, created_at, semantic_embedding, emotional_embedding, entity_ids";

/// Row counts reported by `cairn stats`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MemoryCounts {
    pub total: usize,
    pub with_semantic: usize,
    pub with_emotional: usize,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

type RawMemory = (
    String,
    String,
    String,
    Option<Vec<u8>>,
    Option<Vec<u8>>,
    Option<String>,
);

/// Timestamps are stored with a fixed width so text order is time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid created_at timestamp: {raw}"))?
        .with_timezone(&Utc))
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMemory> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn raw_to_memory(raw: RawMemory) -> Result<Memory> {
    let (id, content, created_at, semantic, emotional, entity_ids) = raw;
    let entity_ids = match entity_ids {
        Some(json) => serde_json::from_str(&json)
            .with_context(|| format!("invalid entity_ids for memory {id}"))?,
        None => Vec::new(),
    };
    Ok(Memory {
        created_at: parse_timestamp(&created_at)?,
        semantic_embedding: semantic.as_deref().map(bytes_to_embedding).transpose()?,
        emotional_embedding: emotional.as_deref().map(bytes_to_embedding).transpose()?,
        entity_ids,
        content,
        id,
    })
}

/// Insert a memory. Returns `false` (and writes nothing) if the id already exists.
pub fn insert_memory(conn: &Connection, memory: &Memory) -> Result<bool> {
    let entity_ids = if memory.entity_ids.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&memory.entity_ids)?)
    };
    let rows = conn.execute(
        "INSERT OR IGNORE INTO memories (id, content, created_at, semantic_embedding, emotional_embedding, entity_ids) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            memory.id,
            memory.content,
            format_timestamp(&memory.created_at),
            memory.semantic_embedding.as_deref().map(embedding_to_bytes),
            memory.emotional_embedding.as_deref().map(embedding_to_bytes),
            entity_ids,
        ],
    )?;
    Ok(rows == 1)
}

/// Fetch a single memory by id.
pub fn get_memory(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    let raw = conn
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
            params![id],
            read_raw,
        )
        .optional()?;
    raw.map(raw_to_memory).transpose()
}

/// The `limit` most recent memories, newest first.
pub fn recent_memories(conn: &Connection, limit: usize) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let raws = stmt
        .query_map(params![limit as i64], read_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(raw_to_memory).collect()
}

pub fn memory_counts(conn: &Connection) -> Result<MemoryCounts> {
    let (total, with_semantic, with_emotional, oldest, newest) = conn.query_row(
        "SELECT COUNT(*), COUNT(semantic_embedding), COUNT(emotional_embedding), MIN(created_at), MAX(created_at) FROM memories",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        },
    )?;
    Ok(MemoryCounts {
        total: total as usize,
        with_semantic: with_semantic as usize,
        with_emotional: with_emotional as usize,
        oldest,
        newest,
    })
}

impl CorpusSource for Connection {
    fn corpus(&self, kind: EmbeddingKind, exclude_id: Option<&str>) -> Result<Vec<CorpusEntry>> {
        let column = kind.column();
        let mut stmt = self.prepare(&format!(
            "SELECT id, content, created_at, {column} FROM memories \
             WHERE {column} IS NOT NULL AND (?1 IS NULL OR id != ?1) ORDER BY created_at, id"
        ))?;
        let rows = stmt
            .query_map(params![exclude_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(memory_id, content, created_at, blob)| {
                Ok(CorpusEntry {
                    created_at: parse_timestamp(&created_at)?,
                    embedding: bytes_to_embedding(&blob)
                        .with_context(|| format!("corrupt {kind} embedding for {memory_id}"))?,
                    memory_id,
                    content,
                })
            })
            .collect()
    }
}
