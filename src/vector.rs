//! Cosine similarity and distance primitives.
//!
//! Zero-magnitude policy: any comparison involving a zero vector (or two
//! vectors of different lengths) yields a similarity of `0.0`, hence a
//! distance of `1.0`. Nothing in this module divides by a zero norm or panics
//! on degenerate input, so a missing embedding substituted by zeros flows
//! through clustering as "unrelated to everything".
//!
//! Bit-identical non-zero vectors compare as exactly `1.0`, which keeps the
//! zero-radius sentinel of a cluster of identical members exact.

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Euclidean norm, accumulated in `f64`.
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Symmetric by construction: `cosine_similarity(a, b) == cosine_similarity(b, a)`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let na = norm(a);
    let nb = norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

/// Cosine distance, `1 - cosine_similarity(a, b)`, in `[0.0, 2.0]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Similarity of one query vector against every row of `matrix`.
pub fn similarities_to(query: &[f32], matrix: ArrayView2<'_, f32>) -> Array1<f64> {
    matrix
        .rows()
        .into_iter()
        .map(|row| match row.as_slice() {
            Some(slice) => cosine_similarity(query, slice),
            None => cosine_similarity(query, &row.to_vec()),
        })
        .collect()
}

/// Symmetric N×N cosine similarity matrix over the rows of `matrix`.
///
/// The diagonal is `1.0` for non-zero rows and `0.0` for zero rows.
pub fn similarity_matrix(matrix: ArrayView2<'_, f32>) -> Array2<f64> {
    let rows: Vec<Vec<f32>> = matrix.rows().into_iter().map(|r| r.to_vec()).collect();
    let n = rows.len();
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        out[[i, i]] = cosine_similarity(&rows[i], &rows[i]);
        for j in (i + 1)..n {
            let sim = cosine_similarity(&rows[i], &rows[j]);
            out[[i, j]] = sim;
            out[[j, i]] = sim;
        }
    }
    out
}

/// Symmetric N×N cosine distance matrix with a zero diagonal.
///
/// Clustering treats a point as being at distance zero from itself, even a
/// zero vector.
pub fn distance_matrix(matrix: ArrayView2<'_, f32>) -> Array2<f64> {
    let mut out = similarity_matrix(matrix).mapv(|s| 1.0 - s);
    out.diag_mut().fill(0.0);
    out
}

/// Element-wise mean of the rows of `matrix`. Not normalized.
///
/// Accumulates in `f64` so the mean of identical rows reproduces the row
/// exactly.
pub fn centroid(matrix: ArrayView2<'_, f32>) -> Vec<f32> {
    if matrix.nrows() == 0 {
        return vec![0.0; matrix.ncols()];
    }
    let wide = matrix.mapv(f64::from);
    match wide.mean_axis(Axis(0)) {
        Some(mean) => mean.iter().map(|&x| x as f32).collect(),
        None => vec![0.0; matrix.ncols()],
    }
}

/// Mean of the strict upper triangle of the pairwise similarity matrix.
///
/// `1.0` for fewer than two rows.
pub fn mean_pairwise_similarity(matrix: ArrayView2<'_, f32>) -> f64 {
    let n = matrix.nrows();
    if n < 2 {
        return 1.0;
    }
    let sims = similarity_matrix(matrix);
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += sims[[i, j]];
        }
    }
    total / (n * (n - 1) / 2) as f64
}
