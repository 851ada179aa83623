use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::model::{DecisionTree, MODEL_FORMAT, RandomForestModel, TreeNode};

/// Forest hyperparameters.
#[derive(Debug, Clone)]
pub struct ForestOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Depth limit per tree; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Candidate features per split; `None` uses `floor(sqrt(n_features))`.
    pub max_features: Option<usize>,
    /// Nodes with fewer rows than this become leaves.
    pub min_samples_split: usize,
    /// Draw each tree's rows with replacement.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(10),
            max_features: None,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Errors raised when the training inputs cannot produce a forest.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("Empty training set")]
    EmptyDataset,
    #[error("Mismatched training inputs: {rows} rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("Label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },
    #[error("Feature names ({names}) do not match table width ({width})")]
    FeatureMismatch { names: usize, width: usize },
    #[error("Need at least 2 classes and 1 tree")]
    Degenerate,
    #[error("Training data contains a non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
}

/// Fit a random forest of CART trees on `x` (rows x features) and `y`.
pub fn train_forest<'a>(
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    feature_names: &[String],
    classes: &[String],
    options: &ForestOptions,
) -> Result<RandomForestModel, ForestError> {
    let (n_rows, n_features) = x.dim();
    if n_rows == 0 || n_features == 0 {
        return Err(ForestError::EmptyDataset);
    }
    if n_rows != y.len() {
        return Err(ForestError::LabelMismatch {
            rows: n_rows,
            labels: y.len(),
        });
    }
    if feature_names.len() != n_features {
        return Err(ForestError::FeatureMismatch {
            names: feature_names.len(),
            width: n_features,
        });
    }
    let n_classes = classes.len();
    if n_classes < 2 || options.n_trees == 0 {
        return Err(ForestError::Degenerate);
    }
    if let Some(&label) = y.iter().find(|&&label| label >= n_classes) {
        return Err(ForestError::LabelOutOfRange {
            label,
            classes: n_classes,
        });
    }
    if let Some(((row, column), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ForestError::NonFinite { row, column });
    }

    let max_features = options
        .max_features
        .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
        .clamp(1, n_features);

    let mut master = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_trees);
    for tree_idx in 0..options.n_trees {
        let tree_seed: u64 = master.random();
        let mut rng = StdRng::seed_from_u64(tree_seed);
        let rows: Vec<usize> = if options.bootstrap {
            (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
        } else {
            (0..n_rows).collect()
        };
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            max_features,
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split.max(2),
            rng,
            nodes: Vec::new(),
        };
        builder.grow(rows, 0);
        let tree = DecisionTree {
            nodes: builder.nodes,
        };
        tracing::trace!(
            tree = tree_idx,
            nodes = tree.nodes.len(),
            depth = tree.depth(),
            "Grew tree"
        );
        trees.push(tree);
    }

    Ok(RandomForestModel {
        format: MODEL_FORMAT.to_string(),
        feature_names: feature_names.to_vec(),
        classes: classes.to_vec(),
        max_depth: options.max_depth,
        seed: options.seed,
        trees,
    })
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: StdRng,
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `rows` and return its node index.
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let node_idx = self.nodes.len();
        let counts = class_counts(self.y, &rows, self.n_classes);
        self.nodes.push(TreeNode::Leaf {
            distribution: distribution(&counts, rows.len()),
        });

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || rows.len() < self.min_samples_split || gini(&counts, rows.len()) == 0.0
        {
            return node_idx;
        }
        let Some(split) = self.best_split(&rows) else {
            return node_idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| self.x[[row, split.feature]] <= split.threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[node_idx] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Search `max_features` random features, continuing past that budget
    /// only while no valid split has turned up (constant features).
    fn best_split(&mut self, rows: &[usize]) -> Option<Split> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<Split> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_for_feature(rows, feature)
                && best.is_none_or(|b| candidate.impurity < b.impurity)
            {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(&self, rows: &[usize], feature: usize) -> Option<Split> {
        let mut column: Vec<(f64, usize)> = rows
            .iter()
            .map(|&row| (self.x[[row, feature]], self.y[row]))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = column.len();
        let mut left = vec![0usize; self.n_classes];
        let mut right = class_counts(self.y, rows, self.n_classes);
        let mut best: Option<Split> = None;
        for i in 0..n - 1 {
            let (value, label) = column[i];
            left[label] += 1;
            right[label] -= 1;
            let next = column[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / n as f64;
            if best.is_none_or(|b| impurity < b.impurity) {
                best = Some(Split {
                    feature,
                    threshold: midpoint(value, next),
                    impurity,
                });
            }
        }
        best
    }
}

/// Midpoint threshold that still sends `low` left and `high` right.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high { low } else { mid }
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &row in rows {
        counts[y[row]] += 1;
    }
    counts
}

fn distribution(counts: &[usize], total: usize) -> Vec<f64> {
    if total == 0 {
        return vec![1.0 / counts.len() as f64; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}
