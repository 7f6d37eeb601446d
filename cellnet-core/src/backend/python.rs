//! Backend that delegates training to an external Python script.

use super::{TrainOutcome, TrainRequest, TrainingBackend};
use crate::config::BackendConfig;
use crate::error::{CellnetError, Result};
use crate::metrics::TrainingMetrics;
use crate::model::{FeatureNet, FeatureNetConfig, bn_feature_net_61x61};
use crate::naming::NameScope;
use crate::runtime::PythonRuntime;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builds the model description in-process and runs the training script once
/// per trial.
///
/// The script gets a JSON object with `model` (the full layer list),
/// `request` (the trial parameters), `generator` (augmentation settings) and
/// `lr_schedule` (one rate per epoch). If it prints a JSON object on its last
/// stdout line, that object is read as [`TrainingMetrics`].
pub struct PythonBackend {
    runtime: PythonRuntime,
    script: PathBuf,
}

impl PythonBackend {
    pub fn new(runtime: PythonRuntime, script: PathBuf) -> Self {
        Self { runtime, script }
    }

    pub fn from_config(cfg: &BackendConfig) -> Self {
        Self::new(PythonRuntime::from_config(cfg), cfg.train_script.clone())
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// The JSON document written to the script's stdin.
    pub fn payload(model: &FeatureNet, request: &TrainRequest) -> serde_json::Value {
        json!({
            "model": model,
            "request": request,
            "generator": request.augmentation.generator_params(),
            "lr_schedule": request.schedule.rates(request.n_epoch),
        })
    }
}

#[async_trait]
impl TrainingBackend for PythonBackend {
    type Model = FeatureNet;

    fn name(&self) -> &str {
        "python"
    }

    fn build_model(&self, config: &FeatureNetConfig, names: &mut NameScope) -> Result<FeatureNet> {
        bn_feature_net_61x61(config, names)
    }

    async fn train(&self, model: FeatureNet, request: &TrainRequest) -> Result<TrainOutcome> {
        if !self.script.exists() {
            return Err(CellnetError::not_found(format!(
                "training script {}",
                self.script.display()
            )));
        }

        let payload = Self::payload(&model, request);
        drop(model);

        info!(
            script = %self.script.display(),
            python = %self.runtime.python_cmd().display(),
            trial = request.trial,
            "Delegating trial to training script"
        );
        let output = self.runtime.run_json(&self.script, &payload).await?;

        let metrics = if output.is_null() {
            debug!(trial = request.trial, "Training script reported no metrics");
            TrainingMetrics::default()
        } else {
            serde_json::from_value::<TrainingMetrics>(output)
                .map_err(|e| CellnetError::training(format!("unreadable metrics: {e}")))?
                .normalize()
        };

        Ok(TrainOutcome { metrics })
    }
}
