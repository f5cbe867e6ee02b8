// tagclust: tag deduplication and document clustering
//
// This is the library root. Each module corresponds to a stage of the
// pipeline: the item-by-tag matrix, duplicate-tag convergence, column
// filtering and PCA, k-means clustering, and output.

pub mod cluster;
pub mod config;
pub mod decision;
pub mod dedup;
pub mod matrix;
pub mod output;
pub mod pipeline;
pub mod reduce;
