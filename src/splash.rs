//! Splash analysis: the most and least similar existing memories for a query.
//!
//! The whole corpus of the requested embedding kind is scored against the
//! query and both extremes are reported. Memories without that embedding are
//! excluded outright, unlike clustering, which substitutes zero vectors.
//!
//! When the corpus holds no more than `2 * count` items the two lists can
//! share members. That is expected and left as is.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::memory::types::{EmbeddingKind, Memory};
use crate::time::{format_age, format_readable};
use crate::vector::cosine_similarity;

/// Characters of content kept in a result preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

// ── Corpus access ───────────────────────────────────────────────

/// One stored memory's embedding of a single kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub memory_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub embedding: Vec<f32>,
}

/// Where splash analysis reads stored embeddings from.
pub trait CorpusSource {
    /// Every stored memory that has an embedding of `kind`, except `exclude_id`.
    fn corpus(
        &self,
        kind: EmbeddingKind,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<CorpusEntry>>;
}

impl<T: CorpusSource + ?Sized> CorpusSource for &T {
    fn corpus(
        &self,
        kind: EmbeddingKind,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<CorpusEntry>> {
        (**self).corpus(kind, exclude_id)
    }
}

/// An in-memory corpus, built from memories already loaded.
impl CorpusSource for [Memory] {
    fn corpus(
        &self,
        kind: EmbeddingKind,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<CorpusEntry>> {
        Ok(self
            .iter()
            .filter(|m| exclude_id != Some(m.id.as_str()))
            .filter_map(|m| {
                m.embedding(kind).map(|e| CorpusEntry {
                    memory_id: m.id.clone(),
                    content: m.content.clone(),
                    created_at: m.created_at,
                    embedding: e.to_vec(),
                })
            })
            .collect())
    }
}

// ── Results ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    MostSimilar,
    LeastSimilar,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MostSimilar => "most_similar",
            Self::LeastSimilar => "least_similar",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplashResult {
    pub memory_id: String,
    pub content: String,
    /// First characters of `content`, suffixed with "..." when cut.
    pub preview: String,
    /// Cosine similarity to the query. May be negative.
    pub similarity_score: f64,
    pub relationship_type: Relationship,
    /// Relative age at analysis time, e.g. "3 days ago".
    pub age: String,
    pub created_at: DateTime<Utc>,
    /// `created_at` as a calendar string in UTC.
    pub created_at_readable: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplashAnalysis {
    /// Highest similarity first.
    pub most_similar: Vec<SplashResult>,
    /// Lowest similarity first.
    pub least_similar: Vec<SplashResult>,
    pub total_analyzed: usize,
    pub analysis_time_ms: f64,
    pub mode: EmbeddingKind,
}

impl SplashAnalysis {
    fn empty(mode: EmbeddingKind) -> Self {
        Self {
            most_similar: Vec::new(),
            least_similar: Vec::new(),
            total_analyzed: 0,
            analysis_time_ms: 0.0,
            mode,
        }
    }
}

/// The query side of a splash analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplashQuery<'a> {
    pub semantic: Option<&'a [f32]>,
    pub emotional: Option<&'a [f32]>,
}

impl<'a> SplashQuery<'a> {
    pub fn semantic(embedding: &'a [f32]) -> Self {
        Self {
            semantic: Some(embedding),
            emotional: None,
        }
    }

    pub fn with_emotional(mut self, embedding: &'a [f32]) -> Self {
        self.emotional = Some(embedding);
        self
    }

    /// Query with whatever embeddings a stored memory carries.
    pub fn from_memory(memory: &'a Memory) -> Self {
        Self {
            semantic: memory.semantic_embedding.as_deref(),
            emotional: memory.emotional_embedding.as_deref(),
        }
    }

    fn embedding(&self, mode: EmbeddingKind) -> Option<&'a [f32]> {
        match mode {
            EmbeddingKind::Semantic => self.semantic,
            EmbeddingKind::Emotional => self.emotional,
        }
    }
}

// ── Engine ──────────────────────────────────────────────────────

pub struct SplashEngine<S> {
    source: S,
    preview_chars: usize,
}

impl<S: CorpusSource> SplashEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Score the stored corpus of `mode` against `query` and return both ends.
    ///
    /// `most_similar` holds the first `count` entries by descending
    /// similarity; `least_similar` holds the last `count`, re-sorted so the
    /// least similar comes first. Ties keep corpus order. A stored embedding
    /// whose width differs from the query is a [`EngineError::DimensionMismatch`].
    pub fn generate_splash(
        &self,
        query: &SplashQuery<'_>,
        mode: EmbeddingKind,
        exclude_id: Option<&str>,
        count: usize,
    ) -> EngineResult<SplashAnalysis> {
        let started = Instant::now();
        let query_embedding = query
            .embedding(mode)
            .ok_or(EngineError::MissingEmbedding { mode })?;

        let corpus = self.source.corpus(mode, exclude_id)?;
        if corpus.is_empty() {
            info!(mode = %mode, "no memories found for splash analysis");
            return Ok(SplashAnalysis::empty(mode));
        }

        if let Some(entry) = corpus
            .iter()
            .find(|entry| entry.embedding.len() != query_embedding.len())
        {
            return Err(EngineError::DimensionMismatch {
                id: entry.memory_id.clone(),
                expected: query_embedding.len(),
                found: entry.embedding.len(),
            });
        }

        let mut scored: Vec<(f64, CorpusEntry)> = corpus
            .into_iter()
            .map(|entry| (cosine_similarity(query_embedding, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let now = Utc::now();
        let most_similar: Vec<SplashResult> = scored
            .iter()
            .take(count)
            .map(|(sim, entry)| self.result(entry, *sim, Relationship::MostSimilar, now))
            .collect();

        let tail_start = scored.len().saturating_sub(count);
        let mut least_similar: Vec<SplashResult> = scored[tail_start..]
            .iter()
            .map(|(sim, entry)| self.result(entry, *sim, Relationship::LeastSimilar, now))
            .collect();
        least_similar.sort_by(|a, b| a.similarity_score.total_cmp(&b.similarity_score));

        let analysis_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            total_memories = scored.len(),
            most_similar_count = most_similar.len(),
            least_similar_count = least_similar.len(),
            analysis_time_ms,
            "splash analysis complete"
        );

        Ok(SplashAnalysis {
            most_similar,
            least_similar,
            total_analyzed: scored.len(),
            analysis_time_ms,
            mode,
        })
    }

    fn result(
        &self,
        entry: &CorpusEntry,
        similarity_score: f64,
        relationship_type: Relationship,
        now: DateTime<Utc>,
    ) -> SplashResult {
        SplashResult {
            memory_id: entry.memory_id.clone(),
            content: entry.content.clone(),
            preview: truncate_preview(&entry.content, self.preview_chars),
            similarity_score,
            relationship_type,
            age: format_age(entry.created_at, now),
            created_at: entry.created_at,
            created_at_readable: format_readable(entry.created_at, now, &Utc),
        }
    }
}

/// First `max_chars` characters of `content`, with "..." appended when cut.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

// ── Presentation ────────────────────────────────────────────────

/// Render an analysis as a Markdown block.
pub fn format_splash_output(analysis: &SplashAnalysis) -> String {
    if analysis.most_similar.is_empty() && analysis.least_similar.is_empty() {
        return "\n**Splash Analysis**: No related memories found (first memory?)".to_string();
    }

    let heading = match analysis.mode {
        EmbeddingKind::Semantic => "Semantic similarity",
        EmbeddingKind::Emotional => "Emotional resonance",
    };
    let mut lines = vec![format!("\n**Splash Analysis** - {heading} distribution")];

    if !analysis.most_similar.is_empty() {
        lines.push(format!("\n**{} Most Similar**", analysis.most_similar.len()));
        lines.extend(analysis.most_similar.iter().map(result_line));
    }
    if !analysis.least_similar.is_empty() {
        lines.push(format!("\n**{} Least Similar**", analysis.least_similar.len()));
        lines.extend(analysis.least_similar.iter().map(result_line));
    }

    lines.push(format!(
        "\nAnalyzed {} memories in {:.1}ms",
        analysis.total_analyzed, analysis.analysis_time_ms
    ));
    lines.join("\n")
}

fn result_line(result: &SplashResult) -> String {
    // Truncates toward zero: 0.995 -> 99, -0.42 -> -42.
    let percent = (result.similarity_score * 100.0) as i64;
    // Only the least-similar section flags opposite meaning.
    let marker = match result.relationship_type {
        Relationship::LeastSimilar if percent < 0 => " (negative)",
        _ => "",
    };
    let short_id: String = result.memory_id.chars().take(8).collect();
    format!(
        "- `{short_id}` | {} | {percent}% similar{marker}\n  \"{}\"",
        result.age, result.preview
    )
}
