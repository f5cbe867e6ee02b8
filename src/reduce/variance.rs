// Variance reduction: how many principal components the tag space needs.
//
// The filtered matrix is standardized and decomposed into all available
// components. k80 and k95 are the smallest component counts whose cumulative
// explained variance reaches 80% and 95%.

use std::collections::BTreeSet;

use anyhow::Result;
use ndarray::Array1;
use serde::Serialize;
use tracing::info;

use super::pca::{standardize, Pca};
use crate::matrix::ItemTagMatrix;

pub const VARIANCE_TARGET_80: f64 = 0.80;
pub const VARIANCE_TARGET_95: f64 = 0.95;

/// The full PCA of the standardized tag matrix and its variance profile.
#[derive(Debug, Clone)]
pub struct ReducedSpace {
    pub tags: Vec<String>,
    pub pca: Pca,
    pub cumulative_variance: Array1<f64>,
    pub k80: usize,
    pub k95: usize,
}

/// Serializable headline numbers of a [`ReducedSpace`].
#[derive(Debug, Clone, Serialize)]
pub struct VarianceSummary {
    pub components: usize,
    pub k80: usize,
    pub k95: usize,
    pub explained_variance_ratio: Vec<f64>,
}

impl ReducedSpace {
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.pca.explained_variance_ratio
    }

    /// For each of the first `n_components` components, the tag with the
    /// largest absolute loading. Deduplicated and sorted.
    pub fn contributing_tags(&self, n_components: usize) -> Vec<String> {
        let loadings = self.pca.loadings();
        let n = n_components.min(loadings.ncols());
        let mut tags = BTreeSet::new();

        for c in 0..n {
            let column = loadings.column(c);
            let best = column
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                .map(|(i, _)| i);
            if let Some(i) = best {
                tags.insert(self.tags[i].clone());
            }
        }

        tags.into_iter().collect()
    }

    /// Contributing tags for an optional component count. Nothing is reported
    /// unless a positive count was requested.
    pub fn requested_contributing_tags(&self, requested: Option<usize>) -> Vec<String> {
        match requested {
            Some(n) if n > 0 => self.contributing_tags(n),
            _ => Vec::new(),
        }
    }

    pub fn summary(&self) -> VarianceSummary {
        VarianceSummary {
            components: self.pca.n_components(),
            k80: self.k80,
            k95: self.k95,
            explained_variance_ratio: self.explained_variance_ratio().to_vec(),
        }
    }
}

/// Standardize the matrix and fit PCA on every available component.
pub fn reduce_variance(matrix: &ItemTagMatrix) -> Result<ReducedSpace> {
    let scaled = standardize(matrix.values());
    let pca = Pca::fit(&scaled, None)?;

    let mut running = 0.0;
    let cumulative: Vec<f64> = pca
        .explained_variance_ratio
        .iter()
        .map(|ratio| {
            running += ratio;
            running
        })
        .collect();
    let k80 = components_for_variance(&cumulative, VARIANCE_TARGET_80);
    let k95 = components_for_variance(&cumulative, VARIANCE_TARGET_95);
    let cumulative_variance = Array1::from(cumulative);

    info!(
        components = pca.n_components(),
        k80,
        k95,
        "Fitted PCA on standardized tag matrix"
    );

    Ok(ReducedSpace {
        tags: matrix.tags().to_vec(),
        pca,
        cumulative_variance,
        k80,
        k95,
    })
}

/// Smallest 1-based component count whose cumulative variance reaches
/// `target`. Falls back to every component if rounding keeps the total just
/// below the target.
pub fn components_for_variance(cumulative: &[f64], target: f64) -> usize {
    cumulative
        .iter()
        .position(|&v| v >= target)
        .map(|i| i + 1)
        .unwrap_or(cumulative.len())
}
