//! Risk records, the synthetic data generator, and train/test splitting.

pub mod record;
pub mod split;
pub mod synth;

pub use record::{FEATURE_COUNT, FEATURE_NAMES, RiskFeatures, RiskLevel, RiskRecord, feature_table};
pub use split::{SplitIndices, train_test_split};
pub use synth::{SynthOptions, SyntheticDataset, generate, level_for_score, risk_score};
