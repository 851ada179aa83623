//! Deterministic random forest classifier.
//!
//! CART trees with Gini splits are grown on bootstrap samples, each searching
//! a random subset of features per split. Leaves keep their class
//! distribution so the forest can average them into probabilities. Models
//! round-trip through JSON with structural validation on load.

mod model;
mod train;

pub use model::{DecisionTree, MODEL_FORMAT, ModelError, RandomForestModel, TreeNode, argmax};
pub use train::{ForestError, ForestOptions, train_forest};
