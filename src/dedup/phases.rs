// Three-phase duplicate-tag convergence.
//
//   Phase 1: group the matrix, take the conjugation pairs, strict-merge.
//   Phase 2: regroup the Phase 1 result, collapse the groups, and lenient-merge
//            every pairwise combination inside each surviving group.
//   Phase 3: regroup the Phase 2 result; any group still holding two or more
//            tags yields "remaining duplicates", which an operator may review
//            one pair at a time. Without an operator this phase passes through.
//
// Each phase consumes the matrix produced by the previous one.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use super::conjugation::{collapse_groups, conjugation_pairs, DuplicatePair};
use super::dissimilarity::tag_dissimilarity;
use super::grouping::{group_tags_by_dissimilarity, TagGroup};
use super::merge::{merge_duplicate_tags, sum_into_sink, MergeMode};
use crate::decision::traits::{resolve_merge, DecisionSource, MergeDecision};
use crate::matrix::ItemTagMatrix;

/// Default similarity threshold for the convergence loop.
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.6;

/// Per-phase bookkeeping for display and logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub phase: u8,
    pub groups: usize,
    pub pairs: usize,
    pub tags_before: usize,
    pub tags_after: usize,
}

/// Outcome of operator review in Phase 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManualOutcome {
    pub merged: usize,
    pub skipped: usize,
    pub aborted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupReport {
    pub threshold: f64,
    pub phases: Vec<PhaseSummary>,
    /// Pairs still looking like duplicates after Phase 2.
    pub remaining: Vec<DuplicatePair>,
    /// Present only when an operator reviewed the remaining pairs.
    pub manual: Option<ManualOutcome>,
}

/// Group the matrix's tags by column dissimilarity.
pub fn tag_groups(matrix: &ItemTagMatrix, threshold: f64) -> Vec<TagGroup> {
    group_tags_by_dissimilarity(&tag_dissimilarity(matrix), threshold)
}

/// Every unordered pair inside each group, as `(g[i], g[j])` with `i < j`.
pub fn pairwise_combinations(groups: &[TagGroup]) -> Vec<DuplicatePair> {
    let mut pairs = Vec::new();
    for group in groups {
        for (i, source) in group.iter().enumerate() {
            for sink in &group[i + 1..] {
                pairs.push(DuplicatePair::new(source.as_str(), sink.as_str()));
            }
        }
    }
    pairs
}

/// Run the three phases. With `manual` set, the remaining duplicates are
/// offered to that decision source; otherwise Phase 3 changes nothing.
pub fn deduplicate_matrix(
    matrix: ItemTagMatrix,
    threshold: f64,
    manual: Option<&mut dyn DecisionSource>,
) -> Result<(ItemTagMatrix, DedupReport)> {
    let mut phases = Vec::with_capacity(3);

    // Phase 1
    let groups = tag_groups(&matrix, threshold);
    let pairs = conjugation_pairs(&groups);
    let phase1 = merge_duplicate_tags(&matrix, &pairs, MergeMode::Strict);
    phases.push(summarize(1, &groups, &pairs, &matrix, &phase1));
    drop(matrix);

    // Phase 2
    let groups = collapse_groups(&tag_groups(&phase1, threshold));
    let pairs = pairwise_combinations(&groups);
    let phase2 = merge_duplicate_tags(&phase1, &pairs, MergeMode::Lenient);
    phases.push(summarize(2, &groups, &pairs, &phase1, &phase2));
    drop(phase1);

    // Phase 3
    let groups: Vec<TagGroup> = collapse_groups(&tag_groups(&phase2, threshold))
        .into_iter()
        .filter(|group| group.len() >= 2)
        .collect();
    let remaining = pairwise_combinations(&groups);

    let (phase3, manual) = match manual {
        Some(decisions) => {
            let (reviewed, outcome) = review_pairs(phase2.clone(), &remaining, decisions)?;
            (reviewed, Some(outcome))
        }
        None => (phase2.clone(), None),
    };
    phases.push(summarize(3, &groups, &remaining, &phase2, &phase3));

    Ok((
        phase3,
        DedupReport {
            threshold,
            phases,
            remaining,
            manual,
        },
    ))
}

/// Offer each pair to the operator. A merge sums the source into the sink.
/// Pairs whose columns are already gone are not offered.
pub fn review_pairs(
    mut matrix: ItemTagMatrix,
    pairs: &[DuplicatePair],
    decisions: &mut dyn DecisionSource,
) -> Result<(ItemTagMatrix, ManualOutcome)> {
    let mut outcome = ManualOutcome::default();

    for pair in pairs {
        if !matrix.has_tag(&pair.source) || !matrix.has_tag(&pair.sink) {
            continue;
        }
        match resolve_merge(decisions, &pair.source, &pair.sink)? {
            MergeDecision::Merge => {
                if sum_into_sink(&mut matrix, pair) {
                    info!(source = %pair.source, sink = %pair.sink, "Merged tags");
                    outcome.merged += 1;
                }
            }
            MergeDecision::Skip => outcome.skipped += 1,
            MergeDecision::Abort => {
                info!(merged = outcome.merged, "Manual review aborted");
                outcome.aborted = true;
                break;
            }
        }
    }

    Ok((matrix, outcome))
}

fn summarize(
    phase: u8,
    groups: &[TagGroup],
    pairs: &[DuplicatePair],
    before: &ItemTagMatrix,
    after: &ItemTagMatrix,
) -> PhaseSummary {
    let summary = PhaseSummary {
        phase,
        groups: groups.len(),
        pairs: pairs.len(),
        tags_before: before.n_tags(),
        tags_after: after.n_tags(),
    };
    info!(
        phase,
        groups = summary.groups,
        pairs = summary.pairs,
        tags_before = summary.tags_before,
        tags_after = summary.tags_after,
        "Deduplication phase complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::scripted::ScriptedDecisions;
    use crate::matrix::DEFAULT_ID_COLUMN;

    fn matrix(columns: Vec<(&str, Vec<f64>)>) -> ItemTagMatrix {
        let rows = columns[0].1.len();
        ItemTagMatrix::from_columns(
            DEFAULT_ID_COLUMN,
            (0..rows).map(|i| format!("doc{i}")).collect(),
            columns.into_iter().map(|(t, v)| (t.to_string(), v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_pairwise_combinations_order() {
        let groups = vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]];
        assert_eq!(
            pairwise_combinations(&groups),
            vec![
                DuplicatePair::new("a", "b"),
                DuplicatePair::new("a", "c"),
                DuplicatePair::new("b", "c"),
            ]
        );
    }

    #[test]
    fn test_single_tag_is_a_no_op() {
        let m = matrix(vec![("soil", vec![1.0, 0.0, 1.0])]);
        let (out, report) = deduplicate_matrix(m.clone(), 0.5, None).unwrap();
        assert_eq!(out, m);
        assert!(report.phases.iter().all(|p| p.groups == 0 && p.pairs == 0));
        assert!(report.manual.is_none());
    }

    #[test]
    fn test_review_skips_and_aborts() {
        let m = matrix(vec![
            ("a", vec![1.0, 0.0]),
            ("b", vec![1.0, 1.0]),
            ("c", vec![0.0, 1.0]),
        ]);
        let pairs = vec![
            DuplicatePair::new("a", "b"),
            DuplicatePair::new("c", "b"),
            DuplicatePair::new("a", "c"),
        ];
        let mut script = ScriptedDecisions::new().with_merge_answers(["n", "y", "q"]);
        let (out, outcome) = review_pairs(m, &pairs, &mut script).unwrap();

        assert_eq!(out.tags(), &["a".to_string(), "b".to_string()]);
        assert_eq!(out.column("b").unwrap().to_vec(), vec![1.0, 2.0]);
        assert_eq!(
            outcome,
            ManualOutcome {
                merged: 1,
                skipped: 1,
                aborted: false,
            }
        );
        // ("a", "c") was never offered: "c" is gone.
        assert_eq!(script.asked_pairs.len(), 2);
        assert_eq!(script.remaining_merge_answers(), 1);
    }

    #[test]
    fn test_review_invalid_answer_reprompts_same_pair() {
        let m = matrix(vec![("a", vec![1.0]), ("b", vec![1.0])]);
        let pairs = vec![DuplicatePair::new("a", "b")];
        let mut script = ScriptedDecisions::new().with_merge_answers(["maybe", "q"]);
        let (out, outcome) = review_pairs(m.clone(), &pairs, &mut script).unwrap();

        assert_eq!(out, m);
        assert!(outcome.aborted);
        assert_eq!(
            script.asked_pairs,
            vec![
                ("a".to_string(), "b".to_string()),
                ("a".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(script.rejections.len(), 1);
    }

    #[test]
    fn test_review_counts_only_applied_merges() {
        let m = matrix(vec![("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let pairs = vec![DuplicatePair::new("a", "a"), DuplicatePair::new("a", "b")];
        let mut script = ScriptedDecisions::new().with_merge_answers(["y", "y"]);
        let (out, outcome) = review_pairs(m, &pairs, &mut script).unwrap();

        // A tag paired with itself has nothing to fold.
        assert_eq!(outcome.merged, 1);
        assert_eq!(out.tags(), &["b".to_string()]);
        assert_eq!(out.column("b").unwrap().to_vec(), vec![1.0, 1.0]);
    }
}
