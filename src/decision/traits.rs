// Decision source trait: the operator-facing suspension points.
//
// Two pipeline steps wait on a human: resolving leftover duplicate pairs after
// deduplication, and choosing the final cluster count from the inertia curve.
// Both go through this trait so the console can be swapped for scripted
// answers in tests and automated runs.
//
// Sources hand back raw answers; validation and re-prompting live in the
// `resolve_*` functions so every source gets the same rules.

use anyhow::Result;
use tracing::warn;

/// What to do with one suggested duplicate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Sum the source into the sink and drop the source.
    Merge,
    /// Leave both columns and move to the next pair.
    Skip,
    /// Stop reviewing; keep the matrix as merged so far.
    Abort,
}

impl MergeDecision {
    /// Parse an operator answer: "y", "n" or "q" (case-insensitive).
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "y" => Some(MergeDecision::Merge),
            "n" => Some(MergeDecision::Skip),
            "q" => Some(MergeDecision::Abort),
            _ => None,
        }
    }
}

/// Where operator answers come from.
pub trait DecisionSource {
    /// Ask whether `source` should be merged into `sink`. Returns the raw answer.
    fn merge_answer(&mut self, source: &str, sink: &str) -> Result<String>;

    /// Ask for the number of clusters, given the inertia of k = 1, 2, ...
    /// Returns the raw answer.
    fn cluster_count_answer(&mut self, inertia: &[f64]) -> Result<String>;

    /// Tell the operator their last answer was rejected. Sources without a
    /// human on the other end can ignore this.
    fn reject(&mut self, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Ask about one pair until a valid answer arrives.
pub fn resolve_merge(
    decisions: &mut dyn DecisionSource,
    source: &str,
    sink: &str,
) -> Result<MergeDecision> {
    loop {
        let answer = decisions.merge_answer(source, sink)?;
        match MergeDecision::parse(&answer) {
            Some(decision) => return Ok(decision),
            None => {
                warn!(source, sink, answer = %answer.trim(), "Invalid merge answer");
                decisions.reject("Input invalid. Please answer with 'y', 'n' or 'q'")?;
            }
        }
    }
}

/// Ask for a cluster count until one in `1..=max` arrives.
pub fn resolve_cluster_count(
    decisions: &mut dyn DecisionSource,
    inertia: &[f64],
    max: usize,
) -> Result<usize> {
    if max == 0 {
        anyhow::bail!("No cluster count is possible without any rows to cluster");
    }
    loop {
        let answer = decisions.cluster_count_answer(inertia)?;
        match answer.trim().parse::<usize>() {
            Ok(k) if (1..=max).contains(&k) => return Ok(k),
            _ => {
                warn!(answer = %answer.trim(), max, "Invalid cluster count");
                decisions.reject(&format!(
                    "Input invalid. Please enter a whole number from 1 to {max}"
                ))?;
            }
        }
    }
}
