// Column filters applied after deduplication, plus tag occurrence counts.

use tracing::debug;

use crate::matrix::ItemTagMatrix;

/// Remove every tag column with no observations.
pub fn drop_zero_columns(matrix: &ItemTagMatrix) -> ItemTagMatrix {
    let keep: Vec<usize> = matrix
        .values()
        .columns()
        .into_iter()
        .enumerate()
        .filter(|(_, column)| column.iter().any(|&v| v != 0.0))
        .map(|(j, _)| j)
        .collect();
    debug!(dropped = matrix.n_tags() - keep.len(), "Dropped zero columns");
    matrix.select_tags(&keep)
}

/// Remove every tag column observed in exactly one document.
pub fn drop_unique_columns(matrix: &ItemTagMatrix) -> ItemTagMatrix {
    let keep: Vec<usize> = matrix
        .values()
        .columns()
        .into_iter()
        .enumerate()
        .filter(|(_, column)| column.iter().filter(|&&v| v != 0.0).count() != 1)
        .map(|(j, _)| j)
        .collect();
    debug!(dropped = matrix.n_tags() - keep.len(), "Dropped single-observation columns");
    matrix.select_tags(&keep)
}

/// Total occurrences per tag, for tags that occur at all, most frequent first.
/// Ties keep column order.
pub fn count_tag_occurrence(matrix: &ItemTagMatrix) -> Vec<(String, f64)> {
    let mut counts: Vec<(String, f64)> = matrix
        .tags()
        .iter()
        .zip(matrix.values().columns())
        .map(|(tag, column)| (tag.clone(), column.sum()))
        .filter(|(_, count)| *count > 0.0)
        .collect();
    counts.sort_by(|a, b| b.1.total_cmp(&a.1));
    counts
}
