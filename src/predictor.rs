//! Single-record inference against a persisted model.
//!
//! Input and output keys keep the names the consuming web service sends and
//! expects (`latitud`, `nivel_riesgo`, ...). Every failure is folded into a
//! `{"error": ...}` payload by [`respond`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::{FEATURE_COUNT, FEATURE_NAMES, RiskLevel, feature_table};
use crate::ml::forest::{ModelError, RandomForestModel, argmax};

/// Errors raised while handling one prediction request.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("No input data received")]
    NoInput,
    #[error("Failed to parse JSON: {0}")]
    Parse(serde_json::Error),
    #[error("Invalid input record: {0}")]
    InvalidInput(serde_json::Error),
    #[error(transparent)]
    ModelLoad(#[from] ModelError),
    #[error("Model expects features {expected:?}")]
    FeatureMismatch { expected: Vec<String> },
    #[error("Model returned {got} probabilities for {expected} risk levels")]
    Inference { got: usize, expected: usize },
}

impl PredictError {
    /// `true` for failures reading the request, before any model work.
    pub fn is_input_error(&self) -> bool {
        matches!(self, PredictError::NoInput | PredictError::Parse(_))
    }
}

/// One feature record as sent on stdin. All keys are required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionInput {
    pub latitud: f64,
    pub longitud: f64,
    pub hora: f64,
    pub dia_semana: f64,
    pub mes: f64,
    pub tipo_delito: f64,
}

impl PredictionInput {
    /// Feature vector in model column order.
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.latitud,
            self.longitud,
            self.hora,
            self.dia_semana,
            self.mes,
            self.tipo_delito,
        ]
    }
}

/// Per-level probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub bajo: f64,
    pub medio: f64,
    pub alto: f64,
}

/// Successful prediction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub nivel_riesgo: u8,
    pub nivel_riesgo_texto: String,
    pub probabilidades: Probabilities,
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything `predict` can print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Prediction(Prediction),
    Error(ErrorResponse),
}

impl PredictResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, PredictResponse::Error(_))
    }

    /// Process exit status for this response.
    pub fn exit_code(&self) -> u8 {
        if self.is_error() { 1 } else { 0 }
    }

    /// Single-line JSON rendering.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"error":"Failed to encode response: {err}"}}"#)
        })
    }
}

impl From<PredictError> for PredictResponse {
    fn from(err: PredictError) -> Self {
        let error = if err.is_input_error() {
            err.to_string()
        } else {
            format!("Prediction failed: {err}")
        };
        PredictResponse::Error(ErrorResponse { error })
    }
}

/// Parse the raw stdin text into a feature record.
///
/// Only zero-length input counts as missing; whitespace is handed to the JSON
/// parser and fails there. Syntax errors and shape errors are kept apart so the caller can tell a
/// garbled request from a record with missing or unknown keys.
pub fn parse_input(raw: &str) -> Result<PredictionInput, PredictError> {
    if raw.is_empty() {
        return Err(PredictError::NoInput);
    }
    let value: serde_json::Value = serde_json::from_str(raw).map_err(PredictError::Parse)?;
    serde_json::from_value(value).map_err(PredictError::InvalidInput)
}

/// Run the model on one record.
pub fn predict_with_model(
    model: &RandomForestModel,
    input: &PredictionInput,
) -> Result<Prediction, PredictError> {
    if model.feature_names.len() != FEATURE_COUNT
        || model.feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
    {
        return Err(PredictError::FeatureMismatch {
            expected: model.feature_names.clone(),
        });
    }
    let table = feature_table([input.to_row()]);
    let proba = model.predict_proba(table.row(0));
    if proba.len() != RiskLevel::ALL.len() {
        return Err(PredictError::Inference {
            got: proba.len(),
            expected: RiskLevel::ALL.len(),
        });
    }
    let level = RiskLevel::from_index(argmax(&proba)).unwrap_or(RiskLevel::Bajo);
    Ok(Prediction {
        nivel_riesgo: level.index() as u8,
        nivel_riesgo_texto: level.label().to_string(),
        probabilidades: Probabilities {
            bajo: proba[RiskLevel::Bajo.index()],
            medio: proba[RiskLevel::Medio.index()],
            alto: proba[RiskLevel::Alto.index()],
        },
    })
}

/// Load the model at `model_path` and run it on one record.
pub fn predict(model_path: &Path, input: &PredictionInput) -> Result<Prediction, PredictError> {
    let model = RandomForestModel::load_json(model_path)?;
    tracing::debug!(
        path = %model_path.display(),
        trees = model.trees.len(),
        "Loaded model"
    );
    predict_with_model(&model, input)
}

/// Handle one raw request end to end. Never panics on bad input.
pub fn respond(model_path: &Path, raw_input: &str) -> PredictResponse {
    let result = parse_input(raw_input).and_then(|input| predict(model_path, &input));
    match result {
        Ok(prediction) => {
            tracing::info!(
                level = %prediction.nivel_riesgo_texto,
                "Prediction complete"
            );
            PredictResponse::Prediction(prediction)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Prediction request failed");
            PredictResponse::from(err)
        }
    }
}
