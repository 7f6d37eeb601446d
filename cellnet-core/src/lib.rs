//! # cellnet-core — repeated-trial training for batch-normalised feature nets
//!
//! Builds the `bn_feature_net_61x61` topology, prepares the optimizer,
//! learning-rate schedule and augmentation settings, and drives a fixed number
//! of independent training trials through a pluggable [`TrainingBackend`].
//!
//! Layer names come from an explicit [`NameScope`] owned by the
//! [`TrainingDriver`], reset between trials, so successive models are named
//! identically instead of accumulating suffixes.

pub mod artifacts;
pub mod augment;
pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod model;
pub mod naming;
pub mod optimizer;
pub mod runtime;
pub mod schedule;

pub use artifacts::TrialArtifacts;
pub use augment::AugmentationFlags;
pub use backend::{ModelInfo, PythonBackend, TrainOutcome, TrainRequest, TrainingBackend};
pub use config::{ConfigOverrides, TrainingConfig, load_config};
pub use driver::TrainingDriver;
pub use error::{CellnetError, Result};
pub use experiment::{ExperimentLedger, TrialRecord, TrialStatus};
pub use metrics::TrainingMetrics;
pub use model::{FeatureNet, FeatureNetConfig, bn_feature_net_61x61};
pub use naming::NameScope;
pub use optimizer::SgdConfig;
pub use runtime::PythonRuntime;
pub use schedule::RateSchedule;
