//! Core memory type definitions.
//!
//! Defines [`Memory`] (an immutable stored record carrying its dual
//! embeddings) and [`EmbeddingKind`] (which of the two embedding spaces an
//! analysis runs in).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two embedding spaces every memory may be projected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    /// Topical / meaning similarity.
    Semantic,
    /// Affective-tone similarity.
    Emotional,
}

impl EmbeddingKind {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Emotional => "emotional",
        }
    }

    /// Column holding this kind of embedding in the `memories` table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic_embedding",
            Self::Emotional => "emotional_embedding",
        }
    }
}

impl std::fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmbeddingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semantic" => Ok(Self::Semantic),
            "emotional" => Ok(Self::Emotional),
            _ => Err(format!("unknown embedding type: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
///
/// Memories are created once at ingestion and never mutated by the analysis
/// code. Either embedding may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID (v7 when generated locally) primary key.
    pub id: String,
    /// The full text content of the memory.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Topical embedding, if one was generated.
    #[serde(default)]
    pub semantic_embedding: Option<Vec<f32>>,
    /// Affective embedding, if one was generated.
    #[serde(default)]
    pub emotional_embedding: Option<Vec<f32>>,
    /// References to canonical entities mentioned in the memory.
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

impl Memory {
    /// The embedding of the requested kind, if present.
    pub fn embedding(&self, kind: EmbeddingKind) -> Option<&[f32]> {
        match kind {
            EmbeddingKind::Semantic => self.semantic_embedding.as_deref(),
            EmbeddingKind::Emotional => self.emotional_embedding.as_deref(),
        }
    }
}
