//! Turn a set of memories into ranked cluster candidates.

use ndarray::Array2;
use tracing::{debug, info};

use super::algorithm::{default_cluster_count, ClusterAlgorithm, ClusterParams, NOISE};
use super::cache::{CacheKey, ClusterCache};
use super::candidate::ClusterCandidate;
use crate::config::CairnConfig;
use crate::error::{EngineError, EngineResult};
use crate::memory::types::{EmbeddingKind, Memory};

/// Default semantic embedding width when no memory in a batch carries one.
pub const DEFAULT_SEMANTIC_DIM: usize = 768;
/// Default emotional embedding width when no memory in a batch carries one.
pub const DEFAULT_EMOTIONAL_DIM: usize = 7;

/// Clusters memories with one configured algorithm and remembers the last run.
///
/// Construct once and share by reference; the cache is internally locked.
pub struct ClusterRankingService {
    algorithm: ClusterAlgorithm,
    semantic_dim: usize,
    emotional_dim: usize,
    cache: ClusterCache,
}

impl ClusterRankingService {
    pub fn new(algorithm: ClusterAlgorithm) -> Self {
        Self {
            algorithm,
            semantic_dim: DEFAULT_SEMANTIC_DIM,
            emotional_dim: DEFAULT_EMOTIONAL_DIM,
            cache: ClusterCache::new(),
        }
    }

    /// Override the fallback widths used for zero-vector substitution.
    pub fn with_dimensions(mut self, semantic_dim: usize, emotional_dim: usize) -> Self {
        self.semantic_dim = semantic_dim;
        self.emotional_dim = emotional_dim;
        self
    }

    pub fn from_config(config: &CairnConfig) -> EngineResult<Self> {
        let algorithm = config.clustering.algorithm.parse()?;
        Ok(Self::new(algorithm)
            .with_dimensions(config.embedding.semantic_dim, config.embedding.emotional_dim))
    }

    pub fn algorithm(&self) -> ClusterAlgorithm {
        self.algorithm
    }

    /// Cluster `memories` and build one candidate per non-noise label.
    ///
    /// Memories lacking the requested embedding are NOT dropped: each is
    /// replaced by a zero vector so labels stay aligned with the input. A
    /// zero vector has similarity 0 to everything, so such memories usually
    /// end up as noise or in a cluster of other zero vectors. Splash analysis
    /// does the opposite and excludes them.
    ///
    /// Candidates come back largest first; equal sizes keep label order of
    /// first appearance. A repeat call with the same algorithm, threshold,
    /// embedding kind, `n_clusters` and memory ids returns the cached run.
    pub fn cluster_memories(
        &self,
        memories: &[Memory],
        similarity_threshold: f64,
        embedding_kind: EmbeddingKind,
        n_clusters: Option<usize>,
    ) -> EngineResult<Vec<ClusterCandidate>> {
        if memories.is_empty() {
            return Ok(Vec::new());
        }

        let n_clusters = match self.algorithm {
            ClusterAlgorithm::Partition => {
                Some(n_clusters.unwrap_or_else(|| default_cluster_count(memories.len())))
            }
            _ => n_clusters,
        };

        let key = CacheKey::new(
            self.algorithm,
            similarity_threshold,
            embedding_kind,
            n_clusters,
            memories,
        );
        if let Some(cached) = self.cache.get(&key) {
            info!(cluster_count = cached.len(), "using cached clustering results");
            return Ok(cached);
        }

        info!(
            memory_count = memories.len(),
            algorithm = %self.algorithm,
            threshold = similarity_threshold,
            "starting clustering"
        );

        let embeddings = embedding_matrix(memories, embedding_kind, self.fallback_dim(embedding_kind))?;
        let params = ClusterParams {
            similarity_threshold,
            n_clusters,
        };
        let labels = self.algorithm.fit_predict(embeddings.view(), &params);

        // Group indices by label in order of first appearance.
        let mut groups: Vec<(i32, Vec<usize>)> = Vec::new();
        for (idx, &label) in labels.iter().enumerate() {
            if label == NOISE {
                continue;
            }
            match groups.iter_mut().find(|(l, _)| *l == label) {
                Some((_, members)) => members.push(idx),
                None => groups.push((label, vec![idx])),
            }
        }

        let mut candidates: Vec<ClusterCandidate> = groups
            .into_iter()
            .filter_map(|(label, indices)| {
                let members = indices.iter().map(|&i| memories[i].clone()).collect();
                let rows = embeddings.select(ndarray::Axis(0), &indices);
                ClusterCandidate::new(label, members, rows.view())
            })
            .collect();
        candidates.sort_by(|a, b| b.memory_count.cmp(&a.memory_count));

        let noise_points = labels.iter().filter(|&&l| l == NOISE).count();
        info!(
            total_memories = memories.len(),
            clusters_found = candidates.len(),
            noise_points,
            "clustering complete"
        );

        self.cache.store(key, candidates.clone());
        Ok(candidates)
    }

    /// Clusters from the most recent run, if any.
    pub fn cached_clusters(&self) -> Option<Vec<ClusterCandidate>> {
        self.cache.clusters()
    }

    /// A cluster from the most recent run by label.
    pub fn cached_cluster(&self, cluster_id: i32) -> Option<ClusterCandidate> {
        self.cache.cluster(cluster_id)
    }

    pub fn clear_cache(&self) {
        debug!("cluster cache cleared");
        self.cache.clear();
    }

    fn fallback_dim(&self, kind: EmbeddingKind) -> usize {
        match kind {
            EmbeddingKind::Semantic => self.semantic_dim,
            EmbeddingKind::Emotional => self.emotional_dim,
        }
    }
}

/// Stack the embeddings of `kind` into an N×D matrix, one row per memory.
///
/// D is the length of the first present embedding, or `fallback_dim` when
/// none is present. Missing embeddings become zero rows. A present embedding
/// of a different length is a [`EngineError::DimensionMismatch`].
pub fn embedding_matrix(
    memories: &[Memory],
    kind: EmbeddingKind,
    fallback_dim: usize,
) -> EngineResult<Array2<f32>> {
    let dim = memories
        .iter()
        .find_map(|m| m.embedding(kind))
        .map_or(fallback_dim, <[f32]>::len);

    let mut matrix = Array2::<f32>::zeros((memories.len(), dim));
    for (i, memory) in memories.iter().enumerate() {
        let Some(embedding) = memory.embedding(kind) else {
            continue;
        };
        if embedding.len() != dim {
            return Err(EngineError::DimensionMismatch {
                id: memory.id.clone(),
                expected: dim,
                found: embedding.len(),
            });
        }
        for (cell, &value) in matrix.row_mut(i).iter_mut().zip(embedding) {
            *cell = value;
        }
    }
    Ok(matrix)
}

// ── Filtering and ordering ──────────────────────────────────────

/// Presentation order for cluster listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterSort {
    /// Highest raw interestingness first; `+∞` ahead of everything.
    #[default]
    Interestingness,
    /// Largest clusters first.
    Size,
    /// Most recently active clusters first.
    Recency,
}

impl ClusterSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interestingness => "interestingness",
            Self::Size => "size",
            Self::Recency => "recency",
        }
    }
}

impl std::fmt::Display for ClusterSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interestingness" => Ok(Self::Interestingness),
            "size" => Ok(Self::Size),
            "recency" => Ok(Self::Recency),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

/// Which candidates to show, and in what order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFilter {
    pub min_cluster_size: usize,
    /// Lower bound on the raw interestingness score.
    pub min_interestingness: Option<f64>,
    pub sort_by: ClusterSort,
    pub limit: Option<usize>,
}

impl Default for ClusterFilter {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_interestingness: None,
            sort_by: ClusterSort::default(),
            limit: None,
        }
    }
}

/// Drop candidates below the filter's thresholds, sort, and truncate.
///
/// Sorting is stable, so candidates with equal keys keep their incoming order.
pub fn rank_candidates(
    candidates: Vec<ClusterCandidate>,
    filter: &ClusterFilter,
) -> Vec<ClusterCandidate> {
    let mut kept: Vec<ClusterCandidate> = candidates
        .into_iter()
        .filter(|c| c.memory_count >= filter.min_cluster_size)
        .filter(|c| {
            filter
                .min_interestingness
                .map_or(true, |min| c.interestingness_score >= min)
        })
        .collect();

    match filter.sort_by {
        ClusterSort::Interestingness => {
            kept.sort_by(|a, b| b.interestingness_score.total_cmp(&a.interestingness_score))
        }
        ClusterSort::Size => kept.sort_by(|a, b| b.memory_count.cmp(&a.memory_count)),
        ClusterSort::Recency => kept.sort_by(|a, b| b.newest.cmp(&a.newest)),
    }

    if let Some(limit) = filter.limit {
        kept.truncate(limit);
    }
    kept
}
