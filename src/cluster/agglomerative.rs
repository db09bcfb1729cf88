//! Average-linkage agglomerative clustering over cosine distance.
//!
//! Starts from singletons and repeatedly merges the closest pair of clusters
//! while their average pairwise distance is strictly below the threshold.
//! There is no fixed cluster count and no noise label: every point ends up
//! in some cluster, possibly a singleton.

use ndarray::{Array2, ArrayView2};

use super::algorithm::Clusterer;
use crate::vector::distance_matrix;

pub struct Agglomerative {
    distance_threshold: f64,
}

impl Agglomerative {
    pub fn new(distance_threshold: f64) -> Self {
        Self { distance_threshold }
    }
}

impl Clusterer for Agglomerative {
    fn fit_predict(&self, embeddings: ArrayView2<'_, f32>) -> Vec<i32> {
        let n = embeddings.nrows();
        if n == 0 {
            return Vec::new();
        }

        // Linkage distances between active clusters, updated with the
        // Lance-Williams rule for average linkage.
        let mut linkage = distance_matrix(embeddings);
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut active = vec![true; n];

        // Closest active cluster with a higher index, per row.
        let mut nearest: Vec<Option<(usize, f64)>> = (0..n)
            .map(|i| nearest_above(&linkage, &active, i))
            .collect();

        loop {
            let mut closest: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| active[i]) {
                if let Some((j, d)) = nearest[i] {
                    if closest.map_or(true, |(_, _, best)| d < best) {
                        closest = Some((i, j, d));
                    }
                }
            }
            let Some((keep, absorb, distance)) = closest else { break };
            if distance >= self.distance_threshold {
                break;
            }

            let size_keep = members[keep].len() as f64;
            let size_absorb = members[absorb].len() as f64;
            for k in (0..n).filter(|&k| active[k] && k != keep && k != absorb) {
                let merged = (size_keep * linkage[[keep, k]] + size_absorb * linkage[[absorb, k]])
                    / (size_keep + size_absorb);
                linkage[[keep, k]] = merged;
                linkage[[k, keep]] = merged;
            }
            let absorbed = std::mem::take(&mut members[absorb]);
            members[keep].extend(absorbed);
            active[absorb] = false;
            nearest[absorb] = None;

            nearest[keep] = nearest_above(&linkage, &active, keep);
            for k in (0..n).filter(|&k| active[k] && k != keep) {
                match nearest[k] {
                    Some((j, _)) if j == keep || j == absorb => {
                        nearest[k] = nearest_above(&linkage, &active, k);
                    }
                    Some((j, d)) if k < keep => {
                        let candidate = linkage[[k, keep]];
                        if candidate < d || (candidate == d && keep < j) {
                            nearest[k] = Some((keep, candidate));
                        }
                    }
                    _ => {}
                }
            }
        }

        // Label clusters in order of their lowest member index.
        let mut clusters: Vec<&Vec<usize>> = (0..n)
            .filter(|&i| active[i])
            .map(|i| &members[i])
            .collect();
        clusters.sort_by_key(|m| m.iter().min().copied().unwrap_or(usize::MAX));

        let mut labels = vec![0i32; n];
        for (label, cluster) in clusters.into_iter().enumerate() {
            for &point in cluster {
                labels[point] = label as i32;
            }
        }
        labels
    }
}

/// Lowest-index active cluster above `row` at the smallest linkage distance.
fn nearest_above(linkage: &Array2<f64>, active: &[bool], row: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for j in ((row + 1)..active.len()).filter(|&j| active[j]) {
        let d = linkage[[row, j]];
        if best.map_or(true, |(_, b)| d < b) {
            best = Some((j, d));
        }
    }
    best
}
