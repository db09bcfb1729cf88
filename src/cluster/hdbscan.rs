//! Variable-density clustering (HDBSCAN) over cosine distance.
//!
//! Pipeline: core distances → mutual reachability graph → minimum spanning
//! tree → single-linkage hierarchy → condensed tree (splits smaller than
//! `min_cluster_size` are points "falling out" of their parent) → excess of
//! mass selection → epsilon merge → labels.
//!
//! The root of the condensed tree is never selected as a cluster, so a corpus
//! that never splits into two sufficiently large groups is all noise.
//! `min_samples` equals `min_cluster_size`, and a point's own zero distance
//! counts towards its core distance.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};

use super::algorithm::{Clusterer, NOISE};
use crate::vector::distance_matrix;

pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: usize,
    selection_epsilon: f64,
}

/// One merge in the single-linkage hierarchy. Node ids `>= n` are merges.
#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// One edge of the condensed tree: `child` leaves (or splits from) `parent` at `lambda`.
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    child_size: usize,
}

impl Hdbscan {
    pub fn new(min_cluster_size: usize, selection_epsilon: f64) -> Self {
        Self {
            min_cluster_size,
            min_samples: min_cluster_size,
            selection_epsilon,
        }
    }
}

impl Clusterer for Hdbscan {
    fn fit_predict(&self, embeddings: ArrayView2<'_, f32>) -> Vec<i32> {
        let n = embeddings.nrows();
        if n == 0 {
            return Vec::new();
        }
        if n < self.min_cluster_size.max(2) {
            return vec![NOISE; n];
        }

        let distances = distance_matrix(embeddings);
        let reachability = mutual_reachability(&distances, self.min_samples);
        let mst = minimum_spanning_tree(&reachability);
        let hierarchy = single_linkage(n, mst);
        let condensed = condense(n, &hierarchy, self.min_cluster_size);

        let root = n;
        let mut selected = excess_of_mass(root, &condensed);
        if self.selection_epsilon > 0.0 && !selected.is_empty() {
            selected = epsilon_merge(root, &condensed, &selected, self.selection_epsilon);
        }
        label_points(n, root, &condensed, &selected)
    }
}

/// `max(core(i), core(j), d(i, j))`, with core distance to the
/// `min_samples`-th nearest point (self included).
fn mutual_reachability(distances: &Array2<f64>, min_samples: usize) -> Array2<f64> {
    let n = distances.nrows();
    let k = min_samples.saturating_sub(1).min(n - 1);
    let core: Vec<f64> = distances
        .rows()
        .into_iter()
        .map(|row| {
            let mut sorted = row.to_vec();
            sorted.sort_by(f64::total_cmp);
            sorted[k]
        })
        .collect();

    let mut out = distances.clone();
    for i in 0..n {
        for j in 0..n {
            if i != j {
                out[[i, j]] = distances[[i, j]].max(core[i]).max(core[j]);
            }
        }
    }
    out
}

/// Prim's algorithm over the dense graph, starting from point 0.
/// Returns `n - 1` edges `(a, b, weight)` sorted by ascending weight.
fn minimum_spanning_tree(weights: &Array2<f64>) -> Vec<(usize, usize, f64)> {
    let n = weights.nrows();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut best_from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        for j in 0..n {
            if !in_tree[j] && weights[[current, j]] < best[j] {
                best[j] = weights[[current, j]];
                best_from[j] = current;
            }
        }
        let mut next = None;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            match next {
                Some(k) if best[j] >= best[k] => {}
                _ => next = Some(j),
            }
        }
        let Some(next) = next else { break };
        in_tree[next] = true;
        edges.push((best_from[next], next, best[next]));
        current = next;
    }

    edges.sort_by(|a, b| a.2.total_cmp(&b.2));
    edges
}

/// Build the single-linkage dendrogram from sorted MST edges.
fn single_linkage(n: usize, edges: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut size = vec![1usize; 2 * n - 1];
    let mut merges = Vec::with_capacity(n - 1);

    fn find(parent: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cursor = x;
        while parent[cursor] != root {
            let next = parent[cursor];
            parent[cursor] = root;
            cursor = next;
        }
        root
    }

    for (a, b, distance) in edges {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        let node = n + merges.len();
        size[node] = size[ra] + size[rb];
        parent[ra] = node;
        parent[rb] = node;
        merges.push(Merge {
            left: ra,
            right: rb,
            distance,
            size: size[node],
        });
    }
    merges
}

fn lambda_of(distance: f64) -> f64 {
    if distance > 0.0 {
        1.0 / distance
    } else {
        f64::MAX
    }
}

/// Breadth-first listing of the hierarchy below `start` (inclusive).
fn descendants(n: usize, hierarchy: &[Merge], start: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        out.push(node);
        if node >= n {
            let merge = hierarchy[node - n];
            queue.push_back(merge.left);
            queue.push_back(merge.right);
        }
    }
    out
}

/// Condense the dendrogram. Cluster labels start at `n` (the root) and grow
/// in breadth-first order, so every child cluster has a larger label than
/// its parent.
fn condense(n: usize, hierarchy: &[Merge], min_cluster_size: usize) -> Vec<CondensedEdge> {
    let root = 2 * n - 2;
    let node_size = |node: usize| if node < n { 1 } else { hierarchy[node - n].size };

    let mut relabel = vec![0usize; 2 * n - 1];
    relabel[root] = n;
    let mut next_label = n + 1;
    let mut ignore = vec![false; 2 * n - 1];
    let mut edges = Vec::new();

    for node in descendants(n, hierarchy, root) {
        if ignore[node] || node < n {
            continue;
        }
        let merge = hierarchy[node - n];
        let lambda = lambda_of(merge.distance);
        let parent = relabel[node];
        let (left, right) = (merge.left, merge.right);
        let (left_size, right_size) = (node_size(left), node_size(right));

        let fall_out = |sub_root: usize, ignore: &mut Vec<bool>, edges: &mut Vec<CondensedEdge>| {
            for sub in descendants(n, hierarchy, sub_root) {
                if sub < n {
                    edges.push(CondensedEdge {
                        parent,
                        child: sub,
                        lambda,
                        child_size: 1,
                    });
                }
                ignore[sub] = true;
            }
        };

        match (left_size >= min_cluster_size, right_size >= min_cluster_size) {
            (true, true) => {
                for (child, child_size) in [(left, left_size), (right, right_size)] {
                    relabel[child] = next_label;
                    edges.push(CondensedEdge {
                        parent,
                        child: next_label,
                        lambda,
                        child_size,
                    });
                    next_label += 1;
                }
            }
            (false, false) => {
                fall_out(left, &mut ignore, &mut edges);
                fall_out(right, &mut ignore, &mut edges);
            }
            (true, false) => {
                relabel[left] = parent;
                fall_out(right, &mut ignore, &mut edges);
            }
            (false, true) => {
                relabel[right] = parent;
                fall_out(left, &mut ignore, &mut edges);
            }
        }
    }
    edges
}

/// Edges whose child is itself a cluster.
fn cluster_edges(condensed: &[CondensedEdge]) -> impl Iterator<Item = &CondensedEdge> {
    condensed.iter().filter(|e| e.child_size > 1)
}

/// Cluster labels below `start` in the cluster tree (inclusive), breadth first.
fn cluster_subtree(condensed: &[CondensedEdge], start: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(cluster) = queue.pop_front() {
        out.push(cluster);
        queue.extend(
            cluster_edges(condensed)
                .filter(|e| e.parent == cluster)
                .map(|e| e.child),
        );
    }
    out
}

/// Excess-of-mass selection. Returns selected cluster labels, ascending.
fn excess_of_mass(root: usize, condensed: &[CondensedEdge]) -> Vec<usize> {
    let max_label = cluster_edges(condensed).map(|e| e.child).max().unwrap_or(root);
    if max_label == root {
        return Vec::new();
    }
    let slots = max_label - root + 1;

    let mut births = vec![0.0f64; slots];
    for edge in cluster_edges(condensed) {
        births[edge.child - root] = edge.lambda;
    }
    let mut stability = vec![0.0f64; slots];
    for edge in condensed {
        let slot = edge.parent - root;
        stability[slot] += (edge.lambda - births[slot]) * edge.child_size as f64;
    }

    let mut is_cluster = vec![true; slots];
    is_cluster[0] = false;

    for cluster in (root + 1..=max_label).rev() {
        let slot = cluster - root;
        let subtree_stability: f64 = cluster_edges(condensed)
            .filter(|e| e.parent == cluster)
            .map(|e| stability[e.child - root])
            .sum();
        if subtree_stability > stability[slot] {
            is_cluster[slot] = false;
            stability[slot] = subtree_stability;
        } else {
            for sub in cluster_subtree(condensed, cluster).into_iter().skip(1) {
                is_cluster[sub - root] = false;
            }
        }
    }

    (0..slots)
        .filter(|&slot| is_cluster[slot])
        .map(|slot| slot + root)
        .collect()
}

/// Replace selected clusters born below `epsilon` (in distance) with the
/// closest ancestor born above it, never climbing to the root.
fn epsilon_merge(root: usize, condensed: &[CondensedEdge], selected: &[usize], epsilon: f64) -> Vec<usize> {
    let edge_into = |cluster: usize| cluster_edges(condensed).find(|e| e.child == cluster);
    let birth_distance = |cluster: usize| edge_into(cluster).map(|e| 1.0 / e.lambda).unwrap_or(f64::INFINITY);

    let mut chosen = Vec::new();
    let mut processed = Vec::new();
    for &leaf in selected {
        if birth_distance(leaf) >= epsilon {
            chosen.push(leaf);
            continue;
        }
        if processed.contains(&leaf) {
            continue;
        }
        let mut node = leaf;
        loop {
            let Some(parent) = edge_into(node).map(|e| e.parent) else { break };
            if parent == root {
                break;
            }
            if birth_distance(parent) > epsilon {
                node = parent;
                break;
            }
            node = parent;
        }
        chosen.push(node);
        processed.extend(cluster_subtree(condensed, node).into_iter().skip(1));
    }
    chosen.sort_unstable();
    chosen.dedup();
    chosen
}

/// Each point takes the label of the innermost selected cluster it belongs
/// to; points that only reach the root are noise. Labels are dense and
/// follow ascending cluster order.
fn label_points(n: usize, root: usize, condensed: &[CondensedEdge], selected: &[usize]) -> Vec<i32> {
    let parent_of = |child: usize| condensed.iter().find(|e| e.child == child).map(|e| e.parent);

    (0..n)
        .map(|point| {
            let mut cluster = parent_of(point);
            while let Some(c) = cluster {
                if c == root {
                    return NOISE;
                }
                if let Ok(position) = selected.binary_search(&c) {
                    return position as i32;
                }
                cluster = parent_of(c);
            }
            NOISE
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn five_point_scenario() -> Array2<f32> {
        array![
            [1.0f32, 0.0, 0.0],
            [0.99, 0.01, 0.0],
            [0.98, 0.02, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.99, 0.01],
        ]
    }

    #[test]
    fn finds_two_groups_without_noise() {
        let m = five_point_scenario();
        let labels = Hdbscan::new(2, 0.1).fit_predict(m.view());
        assert!(labels.iter().all(|&l| l != NOISE));
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn single_tight_group_is_noise() {
        let m = array![[1.0f32, 0.0], [0.99, 0.01], [0.98, 0.02]];
        let labels = Hdbscan::new(2, 0.1).fit_predict(m.view());
        assert_eq!(labels, vec![NOISE; 3]);
    }

    #[test]
    fn single_point_is_noise() {
        let m = array![[1.0f32, 0.0]];
        assert_eq!(Hdbscan::new(2, 0.1).fit_predict(m.view()), vec![NOISE]);
    }

    #[test]
    fn outlier_between_groups_is_noise() {
        let m = array![
            [1.0f32, 0.0, 0.0],
            [0.99, 0.01, 0.0],
            [0.8, 0.6, 0.0],
            [0.79, 0.61, 0.0],
            [-1.0, 0.0, 0.0],
        ];
        let labels = Hdbscan::new(2, 0.1).fit_predict(m.view());
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
        assert_eq!(labels[4], NOISE);
    }

    #[test]
    fn duplicate_points_do_not_produce_nan_stability() {
        let m = array![
            [1.0f32, 0.0],
            [1.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [0.0, 1.0],
        ];
        let labels = Hdbscan::new(2, 0.0).fit_predict(m.view());
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
        assert!(labels.iter().all(|&l| l != NOISE));
    }

    #[test]
    fn deterministic_across_runs() {
        let m = five_point_scenario();
        let a = Hdbscan::new(2, 0.1).fit_predict(m.view());
        let b = Hdbscan::new(2, 0.1).fit_predict(m.view());
        assert_eq!(a, b);
    }
}
