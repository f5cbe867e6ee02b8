// Tag deduplication: dissimilarity, grouping, conjugation resolution,
// column merging, and the three-phase loop that ties them together.

pub mod conjugation;
pub mod dissimilarity;
pub mod grouping;
pub mod merge;
pub mod phases;
