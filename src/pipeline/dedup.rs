// Deduplication pipeline: load the matrix, converge duplicate tags, and
// optionally persist the result.
//
// Columns without a single observation are dropped right after loading.
// Two all-zero columns carry no dissimilarity information, and keeping them
// would only make every later phase group empty tags together.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::decision::traits::DecisionSource;
use crate::dedup::phases::{deduplicate_matrix, DedupReport, DEFAULT_DEDUP_THRESHOLD};
use crate::matrix::io::{read_matrix, write_matrix};
use crate::matrix::{ItemTagMatrix, DEFAULT_ID_COLUMN};
use crate::reduce::filter::drop_zero_columns;

#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub id_column: String,
    pub threshold: f64,
    /// Keep only the first N documents.
    pub records: Option<usize>,
    /// Write the deduplicated matrix here when set.
    pub output: Option<PathBuf>,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            threshold: DEFAULT_DEDUP_THRESHOLD,
            records: None,
            output: None,
        }
    }
}

/// Read the matrix and drop its zero-observation columns.
pub fn load_matrix(path: &Path, id_column: &str, records: Option<usize>) -> Result<ItemTagMatrix> {
    let matrix = read_matrix(path, id_column, records)?;
    let before = matrix.n_tags();
    let matrix = drop_zero_columns(&matrix);
    if matrix.n_tags() < before {
        info!(
            dropped = before - matrix.n_tags(),
            remaining = matrix.n_tags(),
            "Dropped tags without observations"
        );
    }
    Ok(matrix)
}

/// Run the deduplication pipeline on the matrix at `input`.
///
/// With `manual` set, the remaining duplicate pairs are reviewed through it.
/// Returns the deduplicated matrix and the per-phase report.
pub fn run(
    input: &Path,
    options: &DedupOptions,
    manual: Option<&mut dyn DecisionSource>,
) -> Result<(ItemTagMatrix, DedupReport)> {
    // Step 1: Load
    let matrix = load_matrix(input, &options.id_column, options.records)?;

    // Step 2: Converge duplicate tags
    println!(
        "Deduplicating {} tags across {} documents...",
        matrix.n_tags(),
        matrix.n_rows()
    );
    let (deduped, report) = deduplicate_matrix(matrix, options.threshold, manual)?;
    info!(
        tags = deduped.n_tags(),
        remaining_pairs = report.remaining.len(),
        "Deduplication complete"
    );

    // Step 3: Persist
    if let Some(path) = &options.output {
        write_matrix(&deduped, path)?;
        println!("Deduplicated matrix written to {}", path.display());
    }

    Ok((deduped, report))
}
