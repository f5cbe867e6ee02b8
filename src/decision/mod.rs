// Operator decisions: manual duplicate review and cluster-count selection.

pub mod console;
pub mod scripted;
pub mod traits;
