// Principal component analysis on dense ndarray matrices.
//
// Components come from the eigendecomposition of the sample covariance
// (n - 1 denominator), solved by smartcore's symmetric EVD. When there are
// fewer samples than features the smaller Gram matrix is decomposed instead
// and mapped back to feature space. Each component's sign is fixed so its
// largest-magnitude entry is positive, which keeps results reproducible.

use anyhow::Result;
use ndarray::{Array1, Array2, Axis};
use smartcore::linalg::basic::arrays::{Array as _, Array2 as _};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linalg::traits::evd::EVDDecomposable;

const EIGEN_FLOOR: f64 = 1e-10;

/// A fitted PCA model.
#[derive(Debug, Clone)]
pub struct Pca {
    /// Per-feature mean removed before projection.
    pub mean: Array1<f64>,
    /// Principal axes, one row per component, one column per feature.
    pub components: Array2<f64>,
    /// Variance captured by each component.
    pub explained_variance: Array1<f64>,
    /// Share of the total variance captured by each component.
    pub explained_variance_ratio: Array1<f64>,
}

impl Pca {
    /// Fit on a samples × features matrix. `n_components` defaults to
    /// `min(samples, features)`.
    pub fn fit(data: &Array2<f64>, n_components: Option<usize>) -> Result<Self> {
        let (n_samples, n_features) = data.dim();
        if n_samples < 2 {
            anyhow::bail!("PCA needs at least two samples, got {n_samples}");
        }
        if n_features == 0 {
            anyhow::bail!("PCA needs at least one feature");
        }

        let max_components = n_samples.min(n_features);
        let k = n_components.unwrap_or(max_components);
        if k == 0 || k > max_components {
            anyhow::bail!(
                "Cannot keep {k} components from a {n_samples}x{n_features} matrix (max {max_components})"
            );
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow::anyhow!("Cannot take the mean of an empty matrix"))?;
        let centered = data - &mean;
        let denom = (n_samples - 1) as f64;

        let total_variance: f64 = centered.map(|v| v * v).sum() / denom;
        if total_variance <= 0.0 {
            anyhow::bail!("Matrix has no variance to decompose");
        }

        let (eigenvalues, axes) = if n_samples >= n_features {
            let covariance = centered.t().dot(&centered) / denom;
            symmetric_eigen(&covariance)?
        } else {
            let gram = centered.dot(&centered.t()) / denom;
            let (values, vectors) = symmetric_eigen(&gram)?;
            // u -> X^T u / sqrt((n - 1) * lambda) is a unit eigenvector of
            // the covariance matrix with the same eigenvalue.
            let mut mapped = centered.t().dot(&vectors);
            for (j, mut column) in mapped.columns_mut().into_iter().enumerate() {
                let lambda = values[j];
                if lambda > EIGEN_FLOOR {
                    column /= (denom * lambda).sqrt();
                } else {
                    column.fill(0.0);
                }
            }
            (values, mapped)
        };

        let mut components = Array2::zeros((k, n_features));
        let mut explained_variance = Array1::zeros(k);
        for c in 0..k {
            let mut axis = axes.column(c).to_owned();
            let pivot = axis
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                axis.mapv_inplace(|v| -v);
            }
            components.row_mut(c).assign(&axis);
            explained_variance[c] = eigenvalues[c].max(0.0);
        }
        let explained_variance_ratio = &explained_variance / total_variance;

        Ok(Self {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Project samples onto the principal axes (samples × components).
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean).dot(&self.components.t())
    }

    /// Loadings: components scaled by the square root of their variance,
    /// laid out features × components.
    pub fn loadings(&self) -> Array2<f64> {
        let scale = self.explained_variance.mapv(f64::sqrt);
        self.components.t().to_owned() * &scale
    }
}

/// Scale each column to mean 0 and unit (population) variance. Constant
/// columns are only centred.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let mut scaled = data.to_owned();
    for mut column in scaled.columns_mut() {
        let n = column.len().max(1) as f64;
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        column.mapv_inplace(|v| (v - mean) / std);
    }
    scaled
}

/// Eigen-decompose a symmetric matrix with smartcore's tridiagonal QL
/// solver.
///
/// Returns eigenvalues in descending order and the matching unit eigenvectors
/// as columns.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = matrix.nrows();
    let dense = DenseMatrix::<f64>::from_iterator(matrix.iter().copied(), n, n, 0);
    let evd = dense
        .evd(true)
        .map_err(|e| anyhow::anyhow!("Eigendecomposition of a {n}x{n} matrix failed: {e}"))?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| evd.d[j].total_cmp(&evd.d[i]));

    let values = Array1::from_iter(order.iter().map(|&i| evd.d[i]));
    let vectors = Array2::from_shape_fn((n, n), |(row, c)| *evd.V.get((row, order[c])));
    Ok((values, vectors))
}
