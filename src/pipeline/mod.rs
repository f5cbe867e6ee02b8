// Pipeline flows behind the CLI subcommands.
//
// `dedup` loads an item-by-tag matrix and converges its duplicate tags.
// `clusters` takes a deduplicated matrix through filtering, PCA and k-means,
// and writes the cluster artifacts.

pub mod clusters;
pub mod dedup;
