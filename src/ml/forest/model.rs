use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Format tag written into every model file.
pub const MODEL_FORMAT: &str = "crime-risk-forest-v1";

/// Errors raised while validating, loading, or saving a forest.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write model at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model file {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode model: {0}")]
    Encode(serde_json::Error),
    #[error("Invalid model: {0}")]
    Invalid(String),
}

/// Node of a flattened decision tree. The root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `feature <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution of the training rows that reached this leaf.
    Leaf { distribution: Vec<f64> },
}

/// CART classification tree stored as a node array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Class distribution of the leaf reached by `row`.
    pub fn leaf_distribution(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Length of the longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        // Children always follow their parent, which also rules out cycles.
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {idx} splits on unknown feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} probabilities but expected {n_classes}",
                            distribution.len()
                        ));
                    }
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(format!("leaf {idx} has an invalid probability"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fitted random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Model file format tag.
    pub format: String,
    /// Input feature names, in column order.
    pub feature_names: Vec<String>,
    /// Ordered class names.
    pub classes: Vec<String>,
    pub max_depth: Option<usize>,
    pub seed: u64,
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format != MODEL_FORMAT {
            return Err(ModelError::Invalid(format!(
                "Unsupported format {} (expected {MODEL_FORMAT})",
                self.format
            )));
        }
        if self.classes.len() < 2 {
            return Err(ModelError::Invalid(
                "Model must contain at least 2 classes".to_string(),
            ));
        }
        if self.feature_names.is_empty() {
            return Err(ModelError::Invalid("Model has no features".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("Model has no trees".to_string()));
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len(), self.classes.len())
                .map_err(|err| ModelError::Invalid(format!("Tree {tree_idx}: {err}")))?;
        }
        Ok(())
    }

    /// Class probabilities for one row: the mean of the trees' leaf distributions.
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut proba = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_distribution(row)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        for p in &mut proba {
            *p /= n_trees;
        }
        proba
    }

    /// Most probable class index for one row.
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> usize {
        argmax(&self.predict_proba(row))
    }

    /// Load and validate a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&bytes).map_err(|source| ModelError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Serialized model bytes, as written by [`Self::save_json`].
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(ModelError::Encode)
    }

    /// blake3 digest of the serialized model, hex encoded.
    pub fn fingerprint(&self) -> Result<String, ModelError> {
        let bytes = self.to_json_bytes()?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    /// Write the model to `path`, replacing any previous file in one rename.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = self.to_json_bytes()?;
        let write_err = |source| ModelError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(write_err)?;
                parent
            }
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn leaf(distribution: &[f64]) -> TreeNode {
        TreeNode::Leaf {
            distribution: distribution.to_vec(),
        }
    }

    fn stump(threshold: f64, left: &[f64], right: &[f64]) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                leaf(left),
                leaf(right),
            ],
        }
    }

    fn model(trees: Vec<DecisionTree>) -> RandomForestModel {
        RandomForestModel {
            format: MODEL_FORMAT.to_string(),
            feature_names: vec!["x".into(), "y".into()],
            classes: vec!["a".into(), "b".into()],
            max_depth: Some(1),
            seed: 0,
            trees,
        }
    }

    #[test]
    fn tree_routes_on_threshold() {
        let tree = stump(0.5, &[1.0, 0.0], &[0.0, 1.0]);
        assert_eq!(tree.leaf_distribution(array![0.5, 9.0].view()), &[1.0, 0.0]);
        assert_eq!(tree.leaf_distribution(array![0.6, 9.0].view()), &[0.0, 1.0]);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn forest_averages_leaf_distributions() {
        let forest = model(vec![
            stump(0.5, &[1.0, 0.0], &[0.0, 1.0]),
            stump(1.5, &[0.5, 0.5], &[0.0, 1.0]),
        ]);
        let proba = forest.predict_proba(array![1.0, 0.0].view());
        assert_eq!(proba, vec![0.25, 0.75]);
        assert_eq!(forest.predict(array![1.0, 0.0].view()), 1);
        assert_eq!(forest.predict(array![0.0, 0.0].view()), 0);
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.3, 0.6]), 2);
    }

    #[test]
    fn validate_rejects_broken_structure() {
        assert!(model(vec![stump(0.5, &[1.0, 0.0], &[0.0, 1.0])]).validate().is_ok());
        assert!(matches!(model(vec![]).validate(), Err(ModelError::Invalid(_))));

        let mut bad_child = stump(0.5, &[1.0, 0.0], &[0.0, 1.0]);
        bad_child.nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.5,
            left: 1,
            right: 7,
        };
        assert!(model(vec![bad_child]).validate().is_err());

        let short_leaf = stump(0.5, &[1.0], &[0.0, 1.0]);
        assert!(model(vec![short_leaf]).validate().is_err());

        let mut bad_feature = stump(0.5, &[1.0, 0.0], &[0.0, 1.0]);
        bad_feature.nodes[0] = TreeNode::Split {
            feature: 2,
            threshold: 0.5,
            left: 1,
            right: 2,
        };
        assert!(model(vec![bad_feature]).validate().is_err());

        let mut wrong_format = model(vec![stump(0.5, &[1.0, 0.0], &[0.0, 1.0])]);
        wrong_format.format = "pickle".into();
        assert!(wrong_format.validate().is_err());
    }

    #[test]
    fn save_then_load_preserves_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let forest = model(vec![stump(0.5, &[1.0, 0.0], &[0.0, 1.0])]);
        forest.save_json(&path).unwrap();
        let loaded = RandomForestModel::load_json(&path).unwrap();
        assert_eq!(loaded, forest);
        assert_eq!(loaded.fingerprint().unwrap(), forest.fingerprint().unwrap());
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn load_reports_missing_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("model.json");
        assert!(matches!(
            RandomForestModel::load_json(&missing),
            Err(ModelError::Read { .. })
        ));
        std::fs::write(&missing, b"not json").unwrap();
        assert!(matches!(
            RandomForestModel::load_json(&missing),
            Err(ModelError::Decode { .. })
        ));
    }
}
