// Apply duplicate pairs to an item-by-tag matrix.
//
// Strict merging always folds the source column into the sink: wherever the
// source is non-zero the sink takes the source's value (an overwrite, not a
// sum), then the source column goes away. Lenient merging only drops the
// source when it is element-wise identical to the sink.
//
// Pairs whose source or sink is no longer in the matrix (removed by an earlier
// pair or phase) are skipped.

use tracing::debug;

use super::conjugation::DuplicatePair;
use crate::matrix::ItemTagMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Strict,
    Lenient,
}

/// Apply every pair in order and return the merged matrix.
pub fn merge_duplicate_tags(
    matrix: &ItemTagMatrix,
    pairs: &[DuplicatePair],
    mode: MergeMode,
) -> ItemTagMatrix {
    let mut merged = matrix.clone();
    let mut removed = 0usize;

    for pair in pairs {
        let Some((source, sink)) = locate(&merged, pair) else {
            debug!(source = %pair.source, sink = %pair.sink, "Skipping pair with missing column");
            continue;
        };

        match mode {
            MergeMode::Strict => {
                let source_values = merged.values().column(source).to_owned();
                let mut sink_values = merged.column_mut(sink);
                for (s, value) in sink_values.iter_mut().zip(source_values.iter()) {
                    if *value > 0.0 {
                        *s = *value;
                    }
                }
                merged.remove_tag(source);
                removed += 1;
            }
            MergeMode::Lenient => {
                let values = merged.values();
                if values.column(source) == values.column(sink) {
                    merged.remove_tag(source);
                    removed += 1;
                }
            }
        }
    }

    debug!(?mode, pairs = pairs.len(), removed, "Applied duplicate pairs");
    merged
}

/// Fold `source` into `sink` by summing the two columns, then drop `source`.
///
/// Returns false (and leaves the matrix alone) if either column is missing.
pub(crate) fn sum_into_sink(matrix: &mut ItemTagMatrix, pair: &DuplicatePair) -> bool {
    let Some((source, sink)) = locate(matrix, pair) else {
        return false;
    };
    let source_values = matrix.values().column(source).to_owned();
    let mut sink_values = matrix.column_mut(sink);
    sink_values += &source_values;
    matrix.remove_tag(source);
    true
}

fn locate(matrix: &ItemTagMatrix, pair: &DuplicatePair) -> Option<(usize, usize)> {
    if pair.source == pair.sink {
        return None;
    }
    Some((matrix.tag_index(&pair.source)?, matrix.tag_index(&pair.sink)?))
}
