// Cluster engine: documents into k-means clusters in reduced PCA space.
//
// The filtered matrix is projected onto its first k80 principal components
// (fitted on the centred, unscaled counts). K-means runs for every candidate
// count up to `max_clusters` to build an inertia (elbow) curve, the final
// count comes from a decision source, and k-means is fitted once more at that
// count for the final labels.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use serde::Serialize;
use tracing::{info, warn};

use super::kmeans::{self, KMeansConfig};
use crate::decision::traits::{resolve_cluster_count, DecisionSource};
use crate::matrix::ItemTagMatrix;
use crate::reduce::pca::Pca;

pub const DEFAULT_MAX_CLUSTERS: usize = 20;

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub max_clusters: usize,
    pub kmeans: KMeansConfig,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_clusters: DEFAULT_MAX_CLUSTERS,
            kmeans: KMeansConfig::default(),
        }
    }
}

/// Final cluster labels, one per document, with the first three score-space
/// coordinates for plotting or export.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterAssignment {
    pub ids: Vec<String>,
    /// 0-based k-means label per document.
    pub labels: Vec<usize>,
    /// PC1..PC3 scores; missing dimensions are 0.0.
    pub coordinates: Vec<[f64; 3]>,
    pub n_clusters: usize,
    /// Inertia for k = 1, 2, ... as shown to the operator.
    pub inertia: Vec<f64>,
}

impl ClusterAssignment {
    /// Identifiers of the documents carrying `label`, in row order.
    pub fn members(&self, label: usize) -> Vec<&str> {
        self.ids
            .iter()
            .zip(&self.labels)
            .filter(|(_, &l)| l == label)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Number of documents per label.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Fit PCA with `n_components` on the centred matrix and return the scores
/// (documents × components).
pub fn project_scores(matrix: &ItemTagMatrix, n_components: usize) -> Result<Array2<f64>> {
    let pca = Pca::fit(matrix.values(), Some(n_components))?;
    Ok(pca.transform(matrix.values()))
}

/// Inertia of k-means for k = 1..=max_clusters (capped at the row count).
pub fn inertia_curve(scores: &Array2<f64>, max_clusters: usize, config: &KMeansConfig) -> Result<Vec<f64>> {
    let max_k = max_clusters.min(scores.nrows());
    if max_k < max_clusters {
        warn!(max_clusters, rows = scores.nrows(), "Capping cluster candidates at the row count");
    }

    let pb = ProgressBar::new(max_k as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  k-means [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut inertia = Vec::with_capacity(max_k);
    for k in 1..=max_k {
        inertia.push(kmeans::fit(scores, k, config)?.inertia);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(inertia)
}

/// Project, sweep cluster counts, ask for the final count, and label every
/// document.
pub fn assign_clusters(
    matrix: &ItemTagMatrix,
    k80: usize,
    options: &ClusterOptions,
    decisions: &mut dyn DecisionSource,
) -> Result<ClusterAssignment> {
    let scores = project_scores(matrix, k80)?;
    let inertia = inertia_curve(&scores, options.max_clusters, &options.kmeans)?;

    let n_clusters = resolve_cluster_count(decisions, &inertia, inertia.len())?;
    let fit = kmeans::fit(&scores, n_clusters, &options.kmeans)?;

    let coordinates = scores
        .rows()
        .into_iter()
        .map(|row| {
            let mut point = [0.0; 3];
            for (slot, value) in point.iter_mut().zip(row.iter()) {
                *slot = *value;
            }
            point
        })
        .collect();

    info!(
        components = k80,
        clusters = n_clusters,
        inertia = fit.inertia,
        iterations = fit.iterations,
        "Assigned documents to clusters"
    );

    Ok(ClusterAssignment {
        ids: matrix.ids().to_vec(),
        labels: fit.labels,
        coordinates,
        n_clusters,
        inertia,
    })
}
