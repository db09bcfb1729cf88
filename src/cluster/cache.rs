//! Single-slot cache of the most recent clustering run.
//!
//! Lets a follow-up "show me cluster N" resolve against the same labels the
//! caller just saw. Last write wins; the slot sits behind a mutex so a shared
//! service can be used from several threads.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use super::algorithm::ClusterAlgorithm;
use super::candidate::ClusterCandidate;
use crate::memory::types::{EmbeddingKind, Memory};

/// Everything that determines a clustering result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    pub algorithm: ClusterAlgorithm,
    pub similarity_threshold: f64,
    pub embedding_kind: EmbeddingKind,
    pub n_clusters: Option<usize>,
    /// Input memory ids; order does not matter.
    pub memory_ids: BTreeSet<String>,
}

impl CacheKey {
    pub fn new(
        algorithm: ClusterAlgorithm,
        similarity_threshold: f64,
        embedding_kind: EmbeddingKind,
        n_clusters: Option<usize>,
        memories: &[Memory],
    ) -> Self {
        Self {
            algorithm,
            similarity_threshold,
            embedding_kind,
            n_clusters,
            memory_ids: memories.iter().map(|m| m.id.clone()).collect(),
        }
    }
}

struct Entry {
    key: CacheKey,
    clusters: Vec<ClusterCandidate>,
}

#[derive(Default)]
pub struct ClusterCache {
    slot: Mutex<Option<Entry>>,
}

impl ClusterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means another thread panicked mid-store; the slot
    /// is still a complete value, so keep using it.
    fn lock(&self) -> MutexGuard<'_, Option<Entry>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached clusters for `key`, if the last run used exactly these inputs.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<ClusterCandidate>> {
        self.lock()
            .as_ref()
            .filter(|entry| entry.key == *key)
            .map(|entry| entry.clusters.clone())
    }

    pub fn store(&self, key: CacheKey, clusters: Vec<ClusterCandidate>) {
        *self.lock() = Some(Entry { key, clusters });
    }

    /// Clusters of the last run, whatever its inputs.
    pub fn clusters(&self) -> Option<Vec<ClusterCandidate>> {
        self.lock().as_ref().map(|entry| entry.clusters.clone())
    }

    /// One cluster of the last run by its label.
    pub fn cluster(&self, cluster_id: i32) -> Option<ClusterCandidate> {
        self.lock().as_ref().and_then(|entry| {
            entry
                .clusters
                .iter()
                .find(|c| c.cluster_id == cluster_id)
                .cloned()
        })
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}
