// Document clustering: k-means in reduced PCA space.

pub mod engine;
pub mod kmeans;
