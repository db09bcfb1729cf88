#![allow(dead_code)]

use cairn::config::EmbeddingConfig;
use cairn::db;
use cairn::memory::types::Memory;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database(&EmbeddingConfig::default()).unwrap()
}

/// Fixed reference instant so timestamps in tests are reproducible.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
}

/// A memory with a semantic embedding, created `index` hours after [`base_time`].
pub fn memory(id: &str, index: i64, semantic: &[f32]) -> Memory {
    Memory {
        id: id.to_string(),
        content: format!("memory {id}"),
        created_at: base_time() + Duration::hours(index),
        semantic_embedding: Some(semantic.to_vec()),
        emotional_embedding: None,
        entity_ids: Vec::new(),
    }
}

/// A memory with no embeddings at all.
pub fn bare_memory(id: &str, index: i64) -> Memory {
    Memory {
        semantic_embedding: None,
        ..memory(id, index, &[])
    }
}

/// The five-memory scenario: three near `[1,0,0]`, two near `[0,1,0]`.
pub fn five_point_scenario() -> Vec<Memory> {
    vec![
        memory("x0", 0, &[1.0, 0.0, 0.0]),
        memory("x1", 1, &[0.99, 0.01, 0.0]),
        memory("x2", 2, &[0.98, 0.02, 0.0]),
        memory("y0", 3, &[0.0, 1.0, 0.0]),
        memory("y1", 4, &[0.0, 0.99, 0.01]),
    ]
}

/// Deterministic embedding with a spike at `seed` and a small shared tail.
pub fn spike_embedding(seed: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.01f32; dim];
    v[seed % dim] = 1.0;
    v
}

/// Insert every memory into the store.
pub fn insert_all(conn: &Connection, memories: &[Memory]) {
    for m in memories {
        assert!(cairn::memory::store::insert_memory(conn, m).unwrap());
    }
}
