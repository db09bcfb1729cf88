//! Fixed-epsilon density clustering (DBSCAN) over cosine distance.
//!
//! A point is a core point when at least `min_samples` points (itself
//! included) lie within `eps`. Clusters grow from core points in input order;
//! border points join the first cluster that reaches them but never expand
//! it. Everything unreached is [`NOISE`].

use ndarray::ArrayView2;

use super::algorithm::{Clusterer, NOISE};
use crate::vector::distance_matrix;

pub struct Dbscan {
    eps: f64,
    min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }
}

impl Clusterer for Dbscan {
    fn fit_predict(&self, embeddings: ArrayView2<'_, f32>) -> Vec<i32> {
        let n = embeddings.nrows();
        if n == 0 {
            return Vec::new();
        }
        let distances = distance_matrix(embeddings);

        let neighborhoods: Vec<Vec<usize>> = (0..n)
            .map(|i| (0..n).filter(|&j| distances[[i, j]] <= self.eps).collect())
            .collect();
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut labels = vec![NOISE; n];
        let mut next_label = 0;

        for seed in 0..n {
            if labels[seed] != NOISE || !is_core[seed] {
                continue;
            }
            let mut stack = vec![seed];
            while let Some(point) = stack.pop() {
                if labels[point] != NOISE {
                    continue;
                }
                labels[point] = next_label;
                if is_core[point] {
                    stack.extend(
                        neighborhoods[point]
                            .iter()
                            .copied()
                            .filter(|&neighbor| labels[neighbor] == NOISE),
                    );
                }
            }
            next_label += 1;
        }

        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_two_directions() {
        let m = array![
            [1.0f32, 0.0, 0.0],
            [0.99, 0.01, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.99, 0.01],
        ];
        let labels = Dbscan::new(0.1, 2).fit_predict(m.view());
        assert_eq!(labels, vec![0, 0, 1, 1]);
    }

    #[test]
    fn isolated_point_is_noise() {
        let m = array![[1.0f32, 0.0, 0.0], [0.99, 0.01, 0.0], [0.0, 0.0, 1.0]];
        let labels = Dbscan::new(0.1, 2).fit_predict(m.view());
        assert_eq!(labels, vec![0, 0, NOISE]);
    }

    #[test]
    fn chains_through_core_points() {
        // Each neighbour is within eps of the next, the ends are not.
        let m = array![[1.0f32, 0.0], [1.0, 0.3], [1.0, 0.6], [1.0, 0.9]];
        let labels = Dbscan::new(0.05, 2).fit_predict(m.view());
        assert!(labels.iter().all(|&l| l == 0));
    }
}
