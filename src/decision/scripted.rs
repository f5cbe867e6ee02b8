// Pre-scripted decision source for tests and non-interactive runs.

use std::collections::VecDeque;

use anyhow::Result;

use super::traits::DecisionSource;

/// Hands out queued answers in order. Running out of answers is an error,
/// so a script that is too short fails instead of blocking.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    merge_answers: VecDeque<String>,
    cluster_count_answers: VecDeque<String>,
    /// Every (source, sink) pair the pipeline asked about, in order.
    pub asked_pairs: Vec<(String, String)>,
    /// Rejection messages sent back after invalid answers.
    pub rejections: Vec<String>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue answers for manual duplicate review ("y", "n", "q", ...).
    pub fn with_merge_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_answers.extend(answers.into_iter().map(Into::into));
        self
    }

    /// Queue a raw cluster-count answer.
    pub fn with_cluster_count_answer(mut self, answer: impl Into<String>) -> Self {
        self.cluster_count_answers.push_back(answer.into());
        self
    }

    /// Queue a cluster count.
    pub fn with_cluster_count(self, count: usize) -> Self {
        self.with_cluster_count_answer(count.to_string())
    }

    pub fn remaining_merge_answers(&self) -> usize {
        self.merge_answers.len()
    }
}

impl DecisionSource for ScriptedDecisions {
    fn merge_answer(&mut self, source: &str, sink: &str) -> Result<String> {
        self.asked_pairs.push((source.to_string(), sink.to_string()));
        match self.merge_answers.pop_front() {
            Some(answer) => Ok(answer),
            None => anyhow::bail!("No scripted answer left for merging {source:?} into {sink:?}"),
        }
    }

    fn cluster_count_answer(&mut self, _inertia: &[f64]) -> Result<String> {
        match self.cluster_count_answers.pop_front() {
            Some(answer) => Ok(answer),
            None => anyhow::bail!("No scripted cluster count left"),
        }
    }

    fn reject(&mut self, message: &str) -> Result<()> {
        self.rejections.push(message.to_string());
        Ok(())
    }
}
