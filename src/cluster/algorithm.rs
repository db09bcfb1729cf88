//! Algorithm selection and the shared `fit_predict` contract.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::agglomerative::Agglomerative;
use super::dbscan::Dbscan;
use super::hdbscan::Hdbscan;
use super::kmeans::Kmeans;
use crate::error::EngineError;

/// Label assigned to points that belong to no cluster.
pub const NOISE: i32 = -1;

/// Minimum cluster size / minimum samples shared by the density-based algorithms.
pub const MIN_CLUSTER_SIZE: usize = 2;

/// Seed for the partition-based algorithm's random initialization.
pub const KMEANS_SEED: u64 = 42;

/// Number of independent k-means initializations; the lowest-inertia run wins.
pub const KMEANS_RESTARTS: usize = 10;

/// Common contract: map an N×D embedding matrix to N labels, `NOISE` for unclustered.
///
/// Implementations must return an empty vector for empty input.
pub trait Clusterer {
    fn fit_predict(&self, embeddings: ArrayView2<'_, f32>) -> Vec<i32>;
}

/// The supported clustering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAlgorithm {
    /// Variable-density clustering (HDBSCAN, excess-of-mass selection).
    Density,
    /// Fixed-epsilon density clustering (DBSCAN).
    DensityFixedEpsilon,
    /// Average-linkage agglomerative clustering cut at a distance threshold.
    Hierarchical,
    /// K-means partitioning into an explicit number of clusters.
    Partition,
}

/// Parameters handed to [`ClusterAlgorithm::fit_predict`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Minimum cosine similarity for two memories to be considered related.
    pub similarity_threshold: f64,
    /// Explicit cluster count for the partition-based algorithm.
    pub n_clusters: Option<usize>,
}

impl ClusterParams {
    /// The similarity threshold expressed as a cosine distance.
    pub fn epsilon(&self) -> f64 {
        1.0 - self.similarity_threshold
    }
}

impl ClusterAlgorithm {
    /// Name accepted by [`str::parse`] and stored in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Density => "hdbscan",
            Self::DensityFixedEpsilon => "dbscan",
            Self::Hierarchical => "agglomerative",
            Self::Partition => "kmeans",
        }
    }

    /// Run the algorithm over the rows of `embeddings`.
    ///
    /// For [`ClusterAlgorithm::Partition`] a missing `n_clusters` falls back to
    /// [`default_cluster_count`].
    pub fn fit_predict(&self, embeddings: ArrayView2<'_, f32>, params: &ClusterParams) -> Vec<i32> {
        if embeddings.nrows() == 0 {
            return Vec::new();
        }
        let epsilon = params.epsilon();
        match self {
            Self::Density => Hdbscan::new(MIN_CLUSTER_SIZE, epsilon).fit_predict(embeddings),
            Self::DensityFixedEpsilon => Dbscan::new(epsilon, MIN_CLUSTER_SIZE).fit_predict(embeddings),
            Self::Hierarchical => Agglomerative::new(epsilon).fit_predict(embeddings),
            Self::Partition => {
                let k = params
                    .n_clusters
                    .unwrap_or_else(|| default_cluster_count(embeddings.nrows()));
                Kmeans::new(k, KMEANS_SEED, KMEANS_RESTARTS).fit_predict(embeddings)
            }
        }
    }
}

impl std::fmt::Display for ClusterAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hdbscan" => Ok(Self::Density),
            "dbscan" => Ok(Self::DensityFixedEpsilon),
            "agglomerative" => Ok(Self::Hierarchical),
            "kmeans" => Ok(Self::Partition),
            other => Err(EngineError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Default k for partition clustering: `max(2, floor(sqrt(n)))`.
pub fn default_cluster_count(n_items: usize) -> usize {
    ((n_items as f64).sqrt().floor() as usize).max(2)
}

/// Clamp k to `max(2, min(k, n / 2))`, then to `n` so tiny inputs stay fittable.
pub fn clamp_cluster_count(k: usize, n_items: usize) -> usize {
    k.min(n_items / 2).max(2).min(n_items)
}
