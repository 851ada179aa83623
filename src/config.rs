//! Training and prediction settings.
//!
//! Defaults can be overridden by a TOML file and then by command-line flags.
//! The file is the one passed with `--config`, else `crime-risk.toml` in the
//! working directory, else `config.toml` in the application directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// Settings file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "crime-risk.toml";
/// Default model artifact path, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "model.json";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Knobs for data generation, training, and model location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSettings {
    /// Where `train` writes the model and `predict` reads it.
    pub model_path: PathBuf,
    pub seed: u64,
    /// Number of synthetic records to generate.
    pub n_samples: usize,
    /// Fraction of records held out for evaluation.
    pub test_fraction: f64,
    pub n_trees: usize,
    /// Depth limit per tree; `None` (or `0` in TOML) means unlimited.
    pub max_depth: Option<usize>,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            seed: 42,
            n_samples: 1000,
            test_fraction: 0.2,
            n_trees: 100,
            max_depth: Some(10),
        }
    }
}

impl TrainSettings {
    /// Replace out-of-range values with defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.model_path.as_os_str().is_empty() {
            self.model_path = defaults.model_path;
        }
        if self.n_samples < 2 {
            self.n_samples = defaults.n_samples;
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            self.test_fraction = defaults.test_fraction;
        }
        if self.n_trees == 0 {
            self.n_trees = defaults.n_trees;
        }
        if self.max_depth == Some(0) {
            self.max_depth = None;
        }
        self
    }
}

/// Load settings from `explicit` or the first settings file found, falling
/// back to defaults when none exists.
pub fn load_settings(explicit: Option<&Path>) -> Result<TrainSettings, ConfigError> {
    load_settings_in(explicit, Path::new(""))
}

/// Like [`load_settings`], looking for [`LOCAL_CONFIG_FILE`] in `local_dir`
/// instead of the working directory.
pub fn load_settings_in(
    explicit: Option<&Path>,
    local_dir: &Path,
) -> Result<TrainSettings, ConfigError> {
    match resolve_config_path(explicit, local_dir) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading settings");
            load_settings_from(&path)
        }
        None => Ok(TrainSettings::default()),
    }
}

fn resolve_config_path(explicit: Option<&Path>, local_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = local_dir.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    app_dirs::config_file_path().filter(|path| path.is_file())
}

/// Parse a TOML settings file. Missing keys keep their defaults.
pub fn load_settings_from(path: &Path) -> Result<TrainSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<TrainSettings>(&text)
        .map(TrainSettings::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}
