//! A cluster of memories plus the statistics used to rank it.

use chrono::{DateTime, Utc};
use ndarray::ArrayView2;

use crate::memory::types::Memory;
use crate::vector::{centroid, cosine_distance, mean_pairwise_similarity, similarities_to};

/// One cluster produced by a clustering run.
///
/// Recomputed on every run and never persisted. Member order follows the
/// order of the input memories.
#[derive(Debug, Clone)]
pub struct ClusterCandidate {
    /// Label assigned by the clustering algorithm. Never the noise label.
    pub cluster_id: i32,
    pub memories: Vec<Memory>,
    pub memory_count: usize,
    /// Mean pairwise cosine similarity of the members, `1.0` for a singleton.
    pub similarity: f64,
    /// Element-wise mean of the member embeddings, not normalized.
    pub centroid: Vec<f32>,
    /// Largest cosine distance from the centroid to any member.
    pub radius: f64,
    /// Population standard deviation of member distances to the centroid.
    pub density_std: f64,
    /// Harmonic mean of size and tightness; `f64::INFINITY` when `radius == 0`.
    pub interestingness_score: f64,
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
    /// Index into `memories` of the member closest to the centroid.
    pub centroid_index: usize,
    /// Cosine similarity between that member and the centroid.
    pub centroid_distance: f64,
}

impl ClusterCandidate {
    /// Build a candidate from its members and their embeddings, one row per
    /// member in the same order.
    ///
    /// Returns `None` for an empty member list.
    pub fn new(
        cluster_id: i32,
        memories: Vec<Memory>,
        embeddings: ArrayView2<'_, f32>,
    ) -> Option<Self> {
        let oldest = memories.iter().map(|m| m.created_at).min()?;
        let newest = memories.iter().map(|m| m.created_at).max()?;
        let memory_count = memories.len();

        let similarity = mean_pairwise_similarity(embeddings);
        let centroid = centroid(embeddings);

        let distances: Vec<f64> = embeddings
            .rows()
            .into_iter()
            .map(|row| cosine_distance(&centroid, &row.to_vec()))
            .collect();
        let radius = distances.iter().copied().fold(0.0, f64::max);
        let mean = distances.iter().sum::<f64>() / distances.len() as f64;
        let density_std = (distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
            / distances.len() as f64)
            .sqrt();

        // First maximum wins so ties resolve by member order.
        let closeness = similarities_to(&centroid, embeddings);
        let mut centroid_index = 0;
        for (i, &sim) in closeness.iter().enumerate() {
            if sim > closeness[centroid_index] {
                centroid_index = i;
            }
        }
        let centroid_distance = closeness.get(centroid_index).copied().unwrap_or(0.0);

        Some(Self {
            cluster_id,
            memory_count,
            similarity,
            centroid,
            radius,
            density_std,
            interestingness_score: interestingness(memory_count, radius),
            oldest,
            newest,
            centroid_index,
            centroid_distance,
            memories,
        })
    }

    /// The member used as the cluster's representative.
    pub fn centroid_memory(&self) -> &Memory {
        &self.memories[self.centroid_index]
    }

    pub fn memory_ids(&self) -> impl Iterator<Item = &str> {
        self.memories.iter().map(|m| m.id.as_str())
    }

    /// Time between the oldest and newest member, in fractional days.
    pub fn time_span_days(&self) -> f64 {
        (self.newest - self.oldest).num_seconds() as f64 / 86_400.0
    }
}

/// Harmonic mean of `log10(count + 1)` and `1 / radius`.
///
/// A zero radius means every member is identical and scores `+∞`; callers
/// that display the score should bound it first.
pub fn interestingness(memory_count: usize, radius: f64) -> f64 {
    if radius <= 0.0 {
        return f64::INFINITY;
    }
    let size_factor = ((memory_count + 1) as f64).log10();
    let tightness_factor = 1.0 / radius;
    2.0 * (size_factor * tightness_factor) / (size_factor + tightness_factor)
}

/// Map a raw score into `[0, 1]` for display: `score / (1 + score)`, `+∞ → 1`.
pub fn display_interestingness(score: f64) -> f64 {
    if score.is_infinite() && score > 0.0 {
        return 1.0;
    }
    if score <= 0.0 || score.is_nan() {
        return 0.0;
    }
    score / (1.0 + score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::{array, Array2};

    fn memory(id: &str, day: u32) -> Memory {
        Memory {
            id: id.into(),
            content: format!("memory {id}"),
            created_at: Utc.with_ymd_and_hms(2025, 7, day, 12, 0, 0).unwrap(),
            semantic_embedding: None,
            emotional_embedding: None,
            entity_ids: Vec::new(),
        }
    }

    #[test]
    fn identical_members_have_zero_radius_and_infinite_score() {
        let rows = array![[0.6f32, 0.8, 0.0], [0.6, 0.8, 0.0], [0.6, 0.8, 0.0]];
        let members = vec![memory("a", 1), memory("b", 2), memory("c", 3)];
        let c = ClusterCandidate::new(0, members, rows.view()).unwrap();
        assert_eq!(c.radius, 0.0);
        assert_eq!(c.density_std, 0.0);
        assert_eq!(c.interestingness_score, f64::INFINITY);
        assert_eq!(c.similarity, 1.0);
    }

    #[test]
    fn metrics_for_a_tight_pair() {
        let rows = array![[1.0f32, 0.0], [0.0, 1.0]];
        let members = vec![memory("a", 3), memory("b", 1)];
        let c = ClusterCandidate::new(4, members, rows.view()).unwrap();
        assert_eq!(c.cluster_id, 4);
        assert_eq!(c.memory_count, 2);
        assert!(c.similarity.abs() < 1e-12);
        // Both members sit at 45 degrees from the centroid.
        let expected = 1.0 - std::f64::consts::FRAC_1_SQRT_2;
        assert!((c.radius - expected).abs() < 1e-6);
        assert!(c.density_std < 1e-6);
        assert_eq!(c.oldest, Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap());
        assert_eq!(c.newest, Utc.with_ymd_and_hms(2025, 7, 3, 12, 0, 0).unwrap());
        assert!((c.time_span_days() - 2.0).abs() < 1e-9);
        // Tie on closeness: the first member wins.
        assert_eq!(c.centroid_memory().id, "a");
    }

    #[test]
    fn representative_is_nearest_to_centroid() {
        let rows = array![[0.0f32, 1.0], [1.0, 0.1], [1.0, 0.0], [1.0, 0.2]];
        let members = vec![memory("a", 1), memory("b", 2), memory("c", 3), memory("d", 4)];
        let c = ClusterCandidate::new(0, members, rows.view()).unwrap();
        assert_eq!(c.centroid_memory().id, "d");
        assert!(c.centroid_distance > 0.9);
    }

    #[test]
    fn singleton_similarity_is_one() {
        let rows = array![[0.3f32, 0.4]];
        let c = ClusterCandidate::new(0, vec![memory("a", 1)], rows.view()).unwrap();
        assert_eq!(c.similarity, 1.0);
        assert_eq!(c.radius, 0.0);
    }

    #[test]
    fn empty_members_yield_no_candidate() {
        let rows = Array2::<f32>::zeros((0, 2));
        assert!(ClusterCandidate::new(0, Vec::new(), rows.view()).is_none());
    }

    #[test]
    fn score_never_drops_as_radius_shrinks() {
        for count in [1usize, 2, 5, 40, 1000] {
            let mut previous = 0.0;
            for radius in [1.5, 1.0, 0.5, 0.2, 0.1, 0.01, 0.0001] {
                let score = interestingness(count, radius);
                assert!(score >= previous, "count {count} radius {radius}");
                previous = score;
            }
        }
    }

    #[test]
    fn score_never_drops_as_count_grows() {
        for radius in [0.9, 0.3, 0.05, 0.001] {
            let mut previous = 0.0;
            for count in [1usize, 2, 3, 10, 100, 10_000] {
                let score = interestingness(count, radius);
                assert!(score >= previous, "count {count} radius {radius}");
                previous = score;
            }
        }
    }

    #[test]
    fn score_is_harmonic_mean() {
        let size = (10f64).log10();
        let tight = 1.0 / 0.25;
        let expected = 2.0 * size * tight / (size + tight);
        assert!((interestingness(9, 0.25) - expected).abs() < 1e-12);
        assert_eq!(interestingness(3, 0.0), f64::INFINITY);
    }

    #[test]
    fn display_score_is_bounded() {
        assert_eq!(display_interestingness(f64::INFINITY), 1.0);
        assert_eq!(display_interestingness(0.0), 0.0);
        assert!((display_interestingness(1.0) - 0.5).abs() < 1e-12);
        assert!((display_interestingness(3.0) - 0.75).abs() < 1e-12);
        let big = display_interestingness(1e6);
        assert!(big < 1.0 && big > 0.999);
    }
}
