// Tag-space reduction: column filters, PCA, and component selection.

pub mod filter;
pub mod pca;
pub mod variance;
