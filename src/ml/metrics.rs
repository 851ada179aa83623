//! Evaluation metrics for classification models.

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Record one prediction. Out-of-range indices are ignored.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Precision/recall statistics for a single class.
#[derive(Debug, Clone, PartialEq)]
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    (0..k)
        .map(|class_idx| {
            let tp = f64::from(cm.get(class_idx, class_idx));
            let mut fp = 0f64;
            let mut fn_ = 0f64;
            let mut support = 0u32;
            for j in 0..k {
                let v = cm.get(class_idx, j);
                support = support.saturating_add(v);
                if j != class_idx {
                    fn_ += f64::from(v);
                    fp += f64::from(cm.get(j, class_idx));
                }
            }
            PerClassStats {
                precision: if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) },
                recall: if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) },
                support,
            }
        })
        .collect()
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes).map(|i| u64::from(cm.get(i, i))).sum();
    correct as f64 / total as f64
}
