//! Machine learning building blocks: the forest classifier and evaluation metrics.

pub mod forest;
pub mod metrics;
