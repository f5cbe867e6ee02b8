// Clustering pipeline: filter a deduplicated matrix, measure its variance
// profile, cluster documents in reduced space, and write the artifacts.
//
// Strategy: drop zero and single-observation columns, optionally transpose
// (to cluster tags instead of documents), fit PCA to find k80, then sweep
// k-means cluster counts and let the decision source pick the final count.
// Artifacts join each cluster back to the raw metadata export.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cluster::engine::{assign_clusters, ClusterAssignment, ClusterOptions};
use crate::config::DEFAULT_OUTPUT_DIR;
use crate::decision::traits::DecisionSource;
use crate::dedup::phases::DedupReport;
use crate::matrix::ItemTagMatrix;
use crate::output::artifacts::{write_cluster_artifacts, MetadataTable, SaveMode};
use crate::reduce::filter::{drop_unique_columns, drop_zero_columns};
use crate::reduce::variance::{reduce_variance, ReducedSpace, VarianceSummary};

/// Identifier column of a transposed matrix, whose rows are tags.
pub const TRANSPOSED_ID_COLUMN: &str = "Tag";

/// A filtered matrix and the PCA of its standardized form.
#[derive(Debug, Clone)]
pub struct ComponentAnalysis {
    pub matrix: ItemTagMatrix,
    pub space: ReducedSpace,
    /// Rows are tags rather than documents.
    pub transposed: bool,
}

/// Filter the deduplicated matrix and fit the variance reducer.
pub fn analyze_components(deduped: &ItemTagMatrix, transpose: bool) -> Result<ComponentAnalysis> {
    let filtered = drop_unique_columns(&drop_zero_columns(deduped));
    info!(
        tags_before = deduped.n_tags(),
        tags_after = filtered.n_tags(),
        "Filtered sparse tag columns"
    );
    if filtered.n_tags() == 0 {
        anyhow::bail!("No tag is observed in more than one document; nothing left to analyze");
    }

    let matrix = if transpose {
        filtered.transpose(TRANSPOSED_ID_COLUMN)?
    } else {
        filtered
    };

    let space = reduce_variance(&matrix)?;
    Ok(ComponentAnalysis {
        matrix,
        space,
        transposed: transpose,
    })
}

#[derive(Debug, Clone)]
pub struct ClusterRunOptions {
    pub cluster: ClusterOptions,
    pub save: SaveMode,
    pub output_dir: PathBuf,
    /// Prefix of every artifact file name.
    pub basename: String,
}

impl Default for ClusterRunOptions {
    fn default() -> Self {
        Self {
            cluster: ClusterOptions::default(),
            save: SaveMode::Separate,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            basename: "clusters".to_string(),
        }
    }
}

/// What a clustering run produced.
#[derive(Debug, Clone)]
pub struct ClusterRun {
    pub assignment: ClusterAssignment,
    pub variance: VarianceSummary,
    /// Artifact files written, in write order.
    pub written: Vec<PathBuf>,
}

/// Everything needed to reproduce the decisions of a run, saved as JSON.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub dedup: &'a DedupReport,
    pub variance: &'a VarianceSummary,
    pub transposed: bool,
    pub clusters: usize,
    pub sizes: Vec<usize>,
    pub inertia: &'a [f64],
}

/// Cluster the analysed matrix and write the selected artifacts.
pub fn run(
    analysis: &ComponentAnalysis,
    metadata: &MetadataTable,
    report: &DedupReport,
    options: &ClusterRunOptions,
    decisions: &mut dyn DecisionSource,
) -> Result<ClusterRun> {
    // Step 1: Cluster in k80-dimensional score space
    println!(
        "Clustering {} rows on {} components (k80)...",
        analysis.matrix.n_rows(),
        analysis.space.k80
    );
    let assignment = assign_clusters(&analysis.matrix, analysis.space.k80, &options.cluster, decisions)?;
    let variance = analysis.space.summary();

    // Step 2: Join clusters to metadata
    let mut written = Vec::new();
    if options.save != SaveMode::None {
        if analysis.transposed {
            warn!("Rows are tags in transposed mode; skipping the metadata join");
        } else {
            written = write_cluster_artifacts(
                &assignment,
                metadata,
                &options.output_dir,
                &options.basename,
                options.save,
            )?;
        }

        // Step 3: Record the run
        let summary = RunSummary {
            dedup: report,
            variance: &variance,
            transposed: analysis.transposed,
            clusters: assignment.n_clusters,
            sizes: assignment.sizes(),
            inertia: &assignment.inertia,
        };
        let path = options.output_dir.join(format!("{}_summary.json", options.basename));
        write_summary(&summary, &path)?;
        written.push(path);
    }

    info!(
        clusters = assignment.n_clusters,
        files = written.len(),
        "Clustering pipeline complete"
    );

    Ok(ClusterRun {
        assignment,
        variance,
        written,
    })
}

fn write_summary(summary: &RunSummary<'_>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("Failed to write run summary to {}", path.display()))?;
    Ok(())
}

/// Artifact prefix for an input file: its name without the extension.
pub fn basename_of(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clusters".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DEFAULT_ID_COLUMN;

    #[test]
    fn test_basename_strips_extension() {
        assert_eq!(basename_of(Path::new("data/savedrecs.csv")), "savedrecs");
        assert_eq!(basename_of(Path::new("savedrecs")), "savedrecs");
    }

    #[test]
    fn test_analysis_filters_unique_columns() {
        let m = ItemTagMatrix::from_columns(
            DEFAULT_ID_COLUMN,
            (0..4).map(|i| format!("doc{i}")).collect(),
            vec![
                ("soil".into(), vec![1.0, 1.0, 0.0, 0.0]),
                ("once".into(), vec![0.0, 0.0, 1.0, 0.0]),
                ("water".into(), vec![0.0, 1.0, 1.0, 1.0]),
            ],
        )
        .unwrap();
        let analysis = analyze_components(&m, false).unwrap();
        assert_eq!(analysis.matrix.tags(), ["soil", "water"]);
        assert_eq!(analysis.space.tags, vec!["soil", "water"]);
    }

    #[test]
    fn test_transposed_analysis_keys_rows_by_tag() {
        let m = ItemTagMatrix::from_columns(
            DEFAULT_ID_COLUMN,
            (0..3).map(|i| format!("doc{i}")).collect(),
            vec![
                ("soil".into(), vec![1.0, 1.0, 0.0]),
                ("root".into(), vec![1.0, 0.0, 1.0]),
                ("water".into(), vec![0.0, 1.0, 1.0]),
            ],
        )
        .unwrap();
        let analysis = analyze_components(&m, true).unwrap();
        assert!(analysis.transposed);
        assert_eq!(analysis.matrix.id_column(), "Tag");
        assert_eq!(analysis.matrix.ids(), ["soil", "root", "water"]);
    }

    #[test]
    fn test_nothing_left_after_filtering_fails() {
        let m = ItemTagMatrix::from_columns(
            DEFAULT_ID_COLUMN,
            vec!["a".into(), "b".into()],
            vec![("once".into(), vec![1.0, 0.0])],
        )
        .unwrap();
        assert!(analyze_components(&m, false).is_err());
    }
}
