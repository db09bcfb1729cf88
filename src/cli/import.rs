//! CLI `import` command: load memories with precomputed embeddings.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::Path;

use crate::config::CairnConfig;
use crate::memory::store::insert_memory;
use crate::memory::types::Memory;

/// One line of the JSONL import format. Only `content` is required.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    id: Option<String>,
    content: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    semantic_embedding: Option<Vec<f32>>,
    #[serde(default)]
    emotional_embedding: Option<Vec<f32>>,
    #[serde(default)]
    entity_ids: Vec<String>,
}

impl ImportRecord {
    fn into_memory(self, now: DateTime<Utc>) -> Memory {
        Memory {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            content: self.content,
            created_at: self.created_at.unwrap_or(now),
            semantic_embedding: self.semantic_embedding,
            emotional_embedding: self.emotional_embedding,
            entity_ids: self.entity_ids,
        }
    }
}

/// Parse a JSONL document into memories. Blank lines are ignored.
fn parse_jsonl(text: &str, now: DateTime<Utc>) -> Result<Vec<Memory>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            let record: ImportRecord = serde_json::from_str(line)
                .with_context(|| format!("invalid memory on line {}", n + 1))?;
            Ok(record.into_memory(now))
        })
        .collect()
}

/// Import memories from a JSONL file, skipping ids that already exist.
pub fn import(config: &CairnConfig, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let memories = parse_jsonl(&text, Utc::now())?;

    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path, &config.embedding)?;

    println!("Importing {} memories...", memories.len());

    let pb = ProgressBar::new(memories.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut imported = 0u64;
    let mut skipped = 0u64;

    let tx = conn.transaction()?;
    for memory in &memories {
        if insert_memory(&tx, memory)? {
            imported += 1;
        } else {
            skipped += 1;
        }
        pb.inc(1);
    }
    tx.commit()?;
    pb.finish_and_clear();

    tracing::info!(imported, skipped, "import finished");
    println!("Import complete:");
    println!("  Memories imported: {imported}");
    println!("  Memories skipped:  {skipped} (already exist)");

    Ok(())
}
