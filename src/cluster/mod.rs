//! Memory clustering: algorithms, candidates, and ranking.

pub mod agglomerative;
pub mod algorithm;
pub mod cache;
pub mod candidate;
pub mod dbscan;
pub mod hdbscan;
pub mod kmeans;
pub mod ranking;

pub use algorithm::{ClusterAlgorithm, ClusterParams, Clusterer, NOISE};
pub use candidate::{display_interestingness, interestingness, ClusterCandidate};
pub use ranking::{rank_candidates, ClusterFilter, ClusterRankingService, ClusterSort};
