//! Synthetic crime-risk data, a random forest trainer, and a single-record
//! predictor for the Cusco area.

/// Application directory resolution.
pub mod app_dirs;
/// Command-line parsing.
pub mod cli;
/// Layered settings.
pub mod config;
/// Risk records and the synthetic generator.
pub mod dataset;
/// Logging setup.
pub mod logging;
/// Forest classifier and metrics.
pub mod ml;
/// Single-record inference.
pub mod predictor;
/// Training pipeline.
pub mod trainer;
