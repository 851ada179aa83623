//! Application directory helpers anchored to a single `.crime-risk` folder.
//!
//! Config and log files live under the OS config directory by default, with a
//! `CRIME_RISK_CONFIG_HOME` override for tests or portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".crime-risk";
/// Environment variable that replaces the OS config root.
pub const CONFIG_HOME_ENV: &str = "CRIME_RISK_CONFIG_HOME";
/// File name of the settings file inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

static CONFIG_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.crime-risk` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let path = app_root_path().ok_or(AppDirError::NoBaseDir)?;
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Return the logs directory inside the `.crime-risk` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    let path = app_root_dir()?.join("logs");
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Path of the user-level settings file. Nothing is created on disk.
pub fn config_file_path() -> Option<PathBuf> {
    app_root_path().map(|root| root.join(CONFIG_FILE_NAME))
}

fn app_root_path() -> Option<PathBuf> {
    config_base_dir().map(|base| base.join(APP_DIR_NAME))
}

fn config_base_dir() -> Option<PathBuf> {
    if let Some(path) = CONFIG_BASE_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        return Some(path);
    }
    if let Ok(path) = std::env::var(CONFIG_HOME_ENV) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
pub(crate) fn set_config_base_override(path: PathBuf) {
    let mut guard = CONFIG_BASE_OVERRIDE
        .lock()
        .expect("config base override mutex poisoned");
    *guard = Some(path);
}

#[cfg(test)]
pub(crate) fn clear_config_base_override() {
    let mut guard = CONFIG_BASE_OVERRIDE
        .lock()
        .expect("config base override mutex poisoned");
    *guard = None;
}

/// Serializes tests that touch the process-wide config base override.
#[cfg(test)]
pub(crate) struct OverrideGuard {
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
static OVERRIDE_TEST_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
impl OverrideGuard {
    pub(crate) fn set(path: PathBuf) -> Self {
        let lock = OVERRIDE_TEST_LOCK
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        set_config_base_override(path);
        Self { _lock: lock }
    }
}

#[cfg(test)]
impl Drop for OverrideGuard {
    fn drop(&mut self) {
        clear_config_base_override();
    }
}
