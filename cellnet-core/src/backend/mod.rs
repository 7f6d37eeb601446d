//! Training backends.
//!
//! The driver only ever talks to a [`TrainingBackend`]: it asks the backend to
//! build a model from a [`FeatureNetConfig`] and then hands that model back,
//! by value, together with a [`TrainRequest`]. Ownership of the model ends
//! with the `train` call.

pub mod python;

pub use python::PythonBackend;

use crate::artifacts::TrialArtifacts;
use crate::augment::AugmentationFlags;
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::metrics::TrainingMetrics;
use crate::model::{FeatureNet, FeatureNetConfig};
use crate::naming::NameScope;
use crate::optimizer::SgdConfig;
use crate::schedule::RateSchedule;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Everything a backend needs to train one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub dataset: String,
    pub experiment: String,
    pub trial: u32,
    pub batch_size: u32,
    pub n_epoch: u32,
    pub save_dir: PathBuf,
    pub data_dir: PathBuf,
    pub optimizer: SgdConfig,
    pub schedule: RateSchedule,
    pub augmentation: AugmentationFlags,
    pub artifacts: TrialArtifacts,
}

impl TrainRequest {
    pub fn new(config: &TrainingConfig, trial: u32, artifacts: TrialArtifacts) -> Self {
        Self {
            dataset: config.dataset.clone(),
            experiment: config.experiment.clone(),
            trial,
            batch_size: config.batch_size,
            n_epoch: config.n_epoch,
            save_dir: config.save_dir.clone(),
            data_dir: config.data_dir.clone(),
            optimizer: config.optimizer,
            schedule: config.schedule,
            augmentation: config.augmentation,
            artifacts,
        }
    }

    /// Hash of every parameter that must stay constant across trials.
    pub fn fingerprint(&self) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("trial");
            map.remove("artifacts");
        }
        let mut hasher = Sha256::new();
        hasher.update(value.to_string().as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// What a backend reports back after a trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub metrics: TrainingMetrics,
}

/// Read-only facts about a built model, recorded in the trial ledger.
pub trait ModelInfo {
    fn layer_count(&self) -> usize;
    fn trainable_params(&self) -> usize;
}

impl ModelInfo for FeatureNet {
    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn trainable_params(&self) -> usize {
        FeatureNet::trainable_params(self)
    }
}

/// A model builder plus training procedure.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    type Model: ModelInfo + Send;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Build a fresh, untrained model. Layer names come from `names`.
    fn build_model(&self, config: &FeatureNetConfig, names: &mut NameScope) -> Result<Self::Model>;

    /// Train `model` to completion. Blocks (asynchronously) until the trial
    /// has finished and its artefacts are written.
    async fn train(&self, model: Self::Model, request: &TrainRequest) -> Result<TrainOutcome>;
}
