//! End-to-end training: synthesize, split, fit, evaluate, persist.

use std::path::PathBuf;

use ndarray::Axis;

use crate::config::TrainSettings;
use crate::dataset::{FEATURE_NAMES, RiskLevel, SynthOptions, generate, train_test_split};
use crate::ml::forest::{ForestError, ForestOptions, ModelError, RandomForestModel, train_forest};
use crate::ml::metrics::{ConfusionMatrix, PerClassStats, accuracy, precision_recall_by_class};

/// Errors raised by [`train`] and [`fit`].
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Invalid split: {0}")]
    Split(String),
    #[error("Training failed: {0}")]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Held-out evaluation of a freshly fitted model.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Fraction of test rows predicted correctly.
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<PerClassStats>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// blake3 digest of the serialized model.
    pub fingerprint: String,
    pub model_path: PathBuf,
}

/// Fit and evaluate a model without touching the filesystem.
pub fn fit(settings: &TrainSettings) -> Result<(RandomForestModel, TrainReport), TrainError> {
    tracing::info!(
        samples = settings.n_samples,
        seed = settings.seed,
        "Generating synthetic data"
    );
    let dataset = generate(&SynthOptions {
        n_samples: settings.n_samples,
        seed: settings.seed,
    });
    let x = dataset.features();
    let y = dataset.labels();

    let split = train_test_split(dataset.len(), settings.test_fraction, settings.seed)
        .map_err(TrainError::Split)?;
    let x_train = x.select(Axis(0), &split.train);
    let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();
    let x_test = x.select(Axis(0), &split.test);
    let y_test: Vec<usize> = split.test.iter().map(|&i| y[i]).collect();

    tracing::info!(
        trees = settings.n_trees,
        max_depth = ?settings.max_depth,
        train_rows = y_train.len(),
        "Training random forest"
    );
    let feature_names: Vec<String> = FEATURE_NAMES.iter().map(|name| name.to_string()).collect();
    let options = ForestOptions {
        n_trees: settings.n_trees,
        max_depth: settings.max_depth,
        seed: settings.seed,
        ..ForestOptions::default()
    };
    let model = train_forest(
        x_train.view(),
        &y_train,
        &feature_names,
        &RiskLevel::class_names(),
        &options,
    )?;

    let mut confusion = ConfusionMatrix::new(model.classes.len());
    for (row, &truth) in x_test.rows().into_iter().zip(&y_test) {
        confusion.add(truth, model.predict(row));
    }
    let report = TrainReport {
        accuracy: accuracy(&confusion),
        per_class: precision_recall_by_class(&confusion),
        confusion,
        train_rows: y_train.len(),
        test_rows: y_test.len(),
        fingerprint: model.fingerprint()?,
        model_path: settings.model_path.clone(),
    };
    tracing::info!(accuracy = report.accuracy, "Evaluated model on held-out rows");
    Ok((model, report))
}

/// Fit, evaluate, and write the model to `settings.model_path`.
pub fn train(settings: &TrainSettings) -> Result<TrainReport, TrainError> {
    let (model, report) = fit(settings)?;
    model.save_json(&settings.model_path)?;
    tracing::info!(path = %settings.model_path.display(), "Model saved");
    Ok(report)
}
