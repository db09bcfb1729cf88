//! K-means partitioning (Lloyd's algorithm, k-means++ seeding).
//!
//! Works on raw Euclidean geometry of the embeddings. The random generator is
//! seeded once per fit and the restarts draw from it in sequence, so a given
//! input always produces the same labels. The lowest-inertia restart wins;
//! ties keep the earlier restart. Labels are renumbered by first appearance.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::algorithm::{clamp_cluster_count, Clusterer};

const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-4;

pub struct Kmeans {
    k: usize,
    seed: u64,
    restarts: usize,
}

struct Fit {
    labels: Vec<usize>,
    inertia: f64,
}

impl Kmeans {
    /// `k` is clamped against the input size at fit time.
    pub fn new(k: usize, seed: u64, restarts: usize) -> Self {
        Self {
            k,
            seed,
            restarts: restarts.max(1),
        }
    }

    fn fit_once(&self, data: &Array2<f64>, k: usize, tolerance: f64, rng: &mut StdRng) -> Fit {
        let mut centers = seed_centers(data, k, rng);
        let mut labels = vec![0usize; data.nrows()];

        for _ in 0..MAX_ITERATIONS {
            for (i, point) in data.rows().into_iter().enumerate() {
                labels[i] = nearest_center(point, &centers).0;
            }

            let mut updated = Array2::<f64>::zeros(centers.raw_dim());
            let mut counts = vec![0usize; k];
            for (i, point) in data.rows().into_iter().enumerate() {
                let mut row = updated.row_mut(labels[i]);
                row += &point;
                counts[labels[i]] += 1;
            }
            for (c, count) in counts.iter().enumerate() {
                if *count > 0 {
                    let mut row = updated.row_mut(c);
                    row /= *count as f64;
                } else {
                    // Re-seed an empty cluster at the point farthest from its center.
                    let far = farthest_point(data, &labels, &centers);
                    updated.row_mut(c).assign(&data.row(far));
                }
            }

            let shift: f64 = (&updated - &centers).mapv(|x| x * x).sum();
            centers = updated;
            if shift <= tolerance {
                break;
            }
        }

        let mut inertia = 0.0;
        for (i, point) in data.rows().into_iter().enumerate() {
            let (label, dist) = nearest_center(point, &centers);
            labels[i] = label;
            inertia += dist;
        }
        Fit { labels, inertia }
    }
}

impl Clusterer for Kmeans {
    fn fit_predict(&self, embeddings: ArrayView2<'_, f32>) -> Vec<i32> {
        let n = embeddings.nrows();
        if n == 0 {
            return Vec::new();
        }
        let k = clamp_cluster_count(self.k, n);
        let data = embeddings.mapv(f64::from);

        // Convergence tolerance relative to the data's mean per-feature variance.
        let tolerance = data
            .var_axis(Axis(0), 0.0)
            .mean()
            .map(|v| v * TOLERANCE)
            .unwrap_or(0.0);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Fit> = None;
        for _ in 0..self.restarts {
            let fit = self.fit_once(&data, k, tolerance, &mut rng);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        let labels = best.map(|b| b.labels).unwrap_or_else(|| vec![0; n]);
        renumber_by_first_appearance(&labels)
    }
}

/// k-means++: first center uniformly, then proportional to squared distance.
fn seed_centers(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centers = Array2::<f64>::zeros((k, data.ncols()));
    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&data.row(first));

    let mut closest: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|p| squared_distance(p, data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = n - 1;
            for (i, d) in closest.iter().enumerate() {
                acc += d;
                if acc > target {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            rng.gen_range(0..n)
        };
        centers.row_mut(c).assign(&data.row(chosen));
        for (i, p) in data.rows().into_iter().enumerate() {
            closest[i] = closest[i].min(squared_distance(p, data.row(chosen)));
        }
    }
    centers
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest center; the lowest index wins ties.
fn nearest_center(point: ArrayView1<'_, f64>, centers: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, center) in centers.rows().into_iter().enumerate() {
        let d = squared_distance(point, center);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn farthest_point(data: &Array2<f64>, labels: &[usize], centers: &Array2<f64>) -> usize {
    let mut far = (0, -1.0);
    for (i, point) in data.rows().into_iter().enumerate() {
        let d = squared_distance(point, centers.row(labels[i]));
        if d > far.1 {
            far = (i, d);
        }
    }
    far.0
}

fn renumber_by_first_appearance(labels: &[usize]) -> Vec<i32> {
    let mut mapping: Vec<(usize, i32)> = Vec::new();
    labels
        .iter()
        .map(|&label| match mapping.iter().find(|(from, _)| *from == label) {
            Some(&(_, to)) => to,
            None => {
                let to = mapping.len() as i32;
                mapping.push((label, to));
                to
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f32> {
        array![
            [0.0f32, 0.0],
            [0.1, 0.1],
            [0.0, 0.2],
            [10.0, 10.0],
            [10.1, 10.1],
            [9.9, 10.0],
        ]
    }

    #[test]
    fn separates_two_blobs() {
        let labels = Kmeans::new(2, 42, 10).fit_predict(two_blobs().view());
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn same_seed_same_labels() {
        let data = array![
            [0.3f32, 0.1],
            [0.9, 0.4],
            [0.2, 0.8],
            [0.7, 0.7],
            [0.1, 0.2],
            [0.5, 0.5],
            [0.8, 0.1],
        ];
        let a = Kmeans::new(3, 42, 10).fit_predict(data.view());
        let b = Kmeans::new(3, 42, 10).fit_predict(data.view());
        assert_eq!(a, b);
    }

    #[test]
    fn k_is_clamped_to_half_the_points() {
        let labels = Kmeans::new(10, 42, 10).fit_predict(two_blobs().view());
        let distinct: std::collections::HashSet<_> = labels.iter().collect();
        assert!(distinct.len() <= 3);
    }

    #[test]
    fn identical_points_do_not_panic() {
        let data = array![[1.0f32, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let labels = Kmeans::new(2, 42, 10).fit_predict(data.view());
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn renumbering_follows_first_appearance() {
        assert_eq!(renumber_by_first_appearance(&[2, 2, 0, 1, 0]), vec![0, 0, 1, 2, 1]);
    }
}
