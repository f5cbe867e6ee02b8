// Bray-Curtis dissimilarity between tag columns.
//
// Each tag is treated as a vector over documents. Two tags that always occur
// together score 0.0; tags that never share a document score 1.0.
//
//   d(u, v) = sum |u_i - v_i| / sum |u_i + v_i|

use ndarray::{Array2, ArrayView1};

use crate::matrix::ItemTagMatrix;

/// Square, symmetric tag-by-tag dissimilarity matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMatrix {
    tags: Vec<String>,
    values: Array2<f64>,
}

impl DissimilarityMatrix {
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }
}

/// Bray-Curtis distance between two non-negative vectors.
///
/// Two all-zero vectors are identical, so their distance is 0.0.
pub fn bray_curtis(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    let mut diff = 0.0;
    let mut total = 0.0;
    for (a, b) in u.iter().zip(v.iter()) {
        diff += (a - b).abs();
        total += (a + b).abs();
    }
    if total == 0.0 {
        0.0
    } else {
        diff / total
    }
}

/// Compute the dissimilarity of every pair of tag columns in the matrix.
pub fn tag_dissimilarity(matrix: &ItemTagMatrix) -> DissimilarityMatrix {
    let n = matrix.n_tags();
    let columns = matrix.values();
    let mut values = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let d = bray_curtis(columns.column(i), columns.column(j));
            values[[i, j]] = d;
            values[[j, i]] = d;
        }
    }

    DissimilarityMatrix {
        tags: matrix.tags().to_vec(),
        values,
    }
}
