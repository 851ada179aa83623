use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Number of model input features.
pub const FEATURE_COUNT: usize = 6;

/// Feature column names, in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "latitud",
    "longitud",
    "hora",
    "dia_semana",
    "mes",
    "tipo_delito",
];

/// Three-valued risk category predicted by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Bajo = 0,
    Medio = 1,
    Alto = 2,
}

impl RiskLevel {
    /// All levels in class-index order.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Bajo, RiskLevel::Medio, RiskLevel::Alto];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Display name used in prediction output.
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Bajo => "Bajo",
            RiskLevel::Medio => "Medio",
            RiskLevel::Alto => "Alto",
        }
    }

    /// Class names stored in the model artifact.
    pub fn class_names() -> Vec<String> {
        Self::ALL.iter().map(|level| level.label().to_string()).collect()
    }
}

/// Spatio-temporal features of a single incident.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFeatures {
    pub latitud: f64,
    pub longitud: f64,
    /// Hour of day, `0..=23`.
    pub hora: u8,
    /// Day of week, `0..=6` with 0 = Monday.
    pub dia_semana: u8,
    /// Month, `1..=12`.
    pub mes: u8,
    /// Incident type: robbery, assault, theft, violence, other (`0..=4`).
    pub tipo_delito: u8,
}

impl RiskFeatures {
    /// Feature vector in [`FEATURE_NAMES`] order.
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.latitud,
            self.longitud,
            f64::from(self.hora),
            f64::from(self.dia_semana),
            f64::from(self.mes),
            f64::from(self.tipo_delito),
        ]
    }
}

/// Features plus the label derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskRecord {
    pub features: RiskFeatures,
    pub level: RiskLevel,
}

/// Stack feature rows into a `(rows, FEATURE_COUNT)` table.
pub fn feature_table<I>(rows: I) -> Array2<f64>
where
    I: IntoIterator<Item = [f64; FEATURE_COUNT]>,
{
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let n_rows = flat.len() / FEATURE_COUNT;
    Array2::from_shape_vec((n_rows, FEATURE_COUNT), flat)
        .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COUNT)))
}
