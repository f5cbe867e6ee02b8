// Conjugation deduplication: resolve candidate tag groups into canonical tags.
//
// Within one group, tags are visited longest first. A tag that is a leading
// substring of an already-accepted tag ("grow" vs "growth") is treated as a
// conjugation of it: the pair (tag, accepted) is recorded and the tag is
// dropped. Anything else is accepted. This is a literal prefix rule, not
// linguistic stemming, so "cart" is folded into "carton".
//
// Input may be nested; each nesting level is resolved on its own, and all
// levels feed one pair list threaded through the recursion.

use serde::Serialize;

use super::grouping::TagGroup;

/// A tag, or a nested group of tags, as handed to the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTree {
    Tag(String),
    Group(Vec<TagTree>),
}

impl TagTree {
    /// Sort key: character count for a tag, member count for a group.
    pub fn len(&self) -> usize {
        match self {
            TagTree::Tag(tag) => tag.chars().count(),
            TagTree::Group(children) => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wrap flat tag groups as one nested tree level.
    pub fn from_groups(groups: &[TagGroup]) -> Vec<TagTree> {
        groups
            .iter()
            .map(|group| TagTree::Group(group.iter().cloned().map(TagTree::Tag).collect()))
            .collect()
    }

    /// The tags directly inside a group node (nested groups are skipped).
    pub fn tags(&self) -> Vec<String> {
        match self {
            TagTree::Tag(tag) => vec![tag.clone()],
            TagTree::Group(children) => children
                .iter()
                .filter_map(|child| match child {
                    TagTree::Tag(tag) => Some(tag.clone()),
                    TagTree::Group(_) => None,
                })
                .collect(),
        }
    }
}

/// A redundant tag (`source`) and the tag it should be folded into (`sink`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DuplicatePair {
    pub source: String,
    pub sink: String,
}

impl DuplicatePair {
    pub fn new(source: impl Into<String>, sink: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
        }
    }
}

/// What the deduplicator should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjugationMode {
    /// The accepted tags, with the input's nesting rebuilt.
    Collapse,
    /// Every (source, sink) pair found anywhere in the input.
    Pairs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConjugationOutput {
    Collapsed(Vec<TagTree>),
    Pairs(Vec<DuplicatePair>),
}

/// Deduplicate a (possibly nested) tag collection in the given mode.
pub fn deduplicate_tag_conjugations(nodes: &[TagTree], mode: ConjugationMode) -> ConjugationOutput {
    let (collapsed, pairs) = resolve_conjugations(nodes, Vec::new());
    match mode {
        ConjugationMode::Collapse => ConjugationOutput::Collapsed(collapsed),
        ConjugationMode::Pairs => ConjugationOutput::Pairs(pairs),
    }
}

/// Resolve one nesting level and everything below it.
///
/// `pairs` is the accumulator carried through the recursion; the returned
/// list is that accumulator extended with this subtree's pairs.
pub fn resolve_conjugations(
    nodes: &[TagTree],
    mut pairs: Vec<DuplicatePair>,
) -> (Vec<TagTree>, Vec<DuplicatePair>) {
    let mut sorted: Vec<&TagTree> = nodes.iter().collect();
    // Stable: equal lengths keep their input order.
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut accepted: Vec<&str> = Vec::new();
    let mut collapsed = Vec::with_capacity(sorted.len());

    for node in sorted {
        match node {
            TagTree::Group(children) => {
                let (sub, threaded) = resolve_conjugations(children, pairs);
                pairs = threaded;
                collapsed.push(TagTree::Group(sub));
            }
            TagTree::Tag(tag) => {
                match accepted.iter().find(|existing| is_conjugation_of(tag, existing)) {
                    Some(existing) => pairs.push(DuplicatePair::new(tag.as_str(), *existing)),
                    None => {
                        accepted.push(tag);
                        collapsed.push(TagTree::Tag(tag.clone()));
                    }
                }
            }
        }
    }

    (collapsed, pairs)
}

/// Whether `tag` starts with `existing` truncated to `tag`'s length.
pub fn is_conjugation_of(tag: &str, existing: &str) -> bool {
    let prefix: String = existing.chars().take(tag.chars().count()).collect();
    tag.starts_with(&prefix)
}

/// Collapse each flat group to its canonical tags. Groups come back in the
/// deduplicator's order (largest first).
pub fn collapse_groups(groups: &[TagGroup]) -> Vec<TagGroup> {
    let (collapsed, _) = resolve_conjugations(&TagTree::from_groups(groups), Vec::new());
    collapsed.iter().map(TagTree::tags).collect()
}

/// Duplicate pairs found across all flat groups.
pub fn conjugation_pairs(groups: &[TagGroup]) -> Vec<DuplicatePair> {
    resolve_conjugations(&TagTree::from_groups(groups), Vec::new()).1
}
