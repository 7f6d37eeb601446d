//! Configuration for training runs.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment -> overrides.
//! The built-in defaults reproduce the reference training run exactly, so an
//! empty configuration trains five `bn_feature_net_61x61` trials.

use crate::augment::AugmentationFlags;
use crate::error::{CellnetError, Result};
use crate::model::FeatureNetConfig;
use crate::optimizer::SgdConfig;
use crate::schedule::RateSchedule;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix (`CELLNET_BATCH_SIZE`, `CELLNET_OPTIMIZER__LR`, ...).
pub const ENV_PREFIX: &str = "CELLNET_";

/// Everything needed to run a set of training trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Dataset identifier; the backend resolves it inside `data_dir`.
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Experiment name used to tag artefacts.
    #[serde(default = "default_experiment")]
    pub experiment: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_n_epoch")]
    pub n_epoch: u32,
    /// Number of independent trials.
    #[serde(default = "default_trials")]
    pub trials: u32,
    /// Where the backend writes weights and loss histories.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    /// Where the backend reads the dataset from.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub model: FeatureNetConfig,
    #[serde(default)]
    pub optimizer: SgdConfig,
    #[serde(default)]
    pub schedule: RateSchedule,
    #[serde(default)]
    pub augmentation: AugmentationFlags,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            experiment: default_experiment(),
            batch_size: default_batch_size(),
            n_epoch: default_n_epoch(),
            trials: default_trials(),
            save_dir: default_save_dir(),
            data_dir: default_data_dir(),
            model: FeatureNetConfig::default(),
            optimizer: SgdConfig::default(),
            schedule: RateSchedule::default(),
            augmentation: AugmentationFlags::default(),
            backend: BackendConfig::default(),
        }
    }
}

fn default_dataset() -> String {
    "3T3_all_61x61".to_string()
}

fn default_experiment() -> String {
    "bn_feature_net_61x61".to_string()
}

fn default_batch_size() -> u32 {
    256
}

fn default_n_epoch() -> u32 {
    25
}

fn default_trials() -> u32 {
    5
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("/home/DeepCell/trained_networks_new/")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/home//DeepCell/training_data_npz/")
}

impl TrainingConfig {
    /// Check the combined configuration after all layers are merged.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(CellnetError::config("dataset must not be empty"));
        }
        if self.experiment.trim().is_empty() {
            return Err(CellnetError::config("experiment must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(CellnetError::config("batch_size must be at least 1"));
        }
        if self.n_epoch == 0 {
            return Err(CellnetError::config("n_epoch must be at least 1"));
        }
        self.model
            .validate()
            .map_err(|e| CellnetError::config(e.to_string()))?;
        self.optimizer.validate()?;
        self.schedule.validate()?;
        Ok(())
    }

    /// Path of the trial ledger inside the save directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.save_dir
            .join(format!("{}_trials.json", self.experiment))
    }
}

/// External training backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Path to the Python interpreter.
    #[serde(default = "default_python_path")]
    pub python_path: PathBuf,
    /// Virtual environment whose interpreter takes precedence over `python_path`.
    #[serde(default)]
    pub venv_path: Option<PathBuf>,
    /// Training script that receives one trial request as JSON on stdin.
    /// Its last stdout line, when it is a JSON object, is read as the trial's
    /// metrics; any other output leaves the metrics empty.
    #[serde(default = "default_train_script")]
    pub train_script: PathBuf,
    /// Working directory for the script (defaults to the current directory).
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    /// Per-trial time limit in seconds. Unset means no limit.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            python_path: default_python_path(),
            venv_path: None,
            train_script: default_train_script(),
            workdir: None,
            timeout_secs: None,
        }
    }
}

fn default_python_path() -> PathBuf {
    PathBuf::from("python3")
}

fn default_train_script() -> PathBuf {
    PathBuf::from("train_model_sample.py")
}

/// Values set explicitly by the caller (usually CLI flags).
///
/// Only the fields that are `Some` are merged, so every other setting keeps
/// the value from the lower layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_epoch: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trials: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// User-level config file (`~/.config/cellnet/config.toml` on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "cellnet", "cellnet")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".cellnet").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (only the fields that are set)
/// 2. Environment variables (prefixed with `CELLNET_`, `__` for nesting)
/// 3. Explicit config file
/// 4. Workspace config (`.cellnet/config.toml`)
/// 5. User config
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<TrainingConfig> {
    let mut figment = Figment::from(Serialized::defaults(TrainingConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(CellnetError::not_found(format!(
                "config file {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: TrainingConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainingConfig::default();
        assert_eq!(cfg.batch_size, 256);
        assert_eq!(cfg.n_epoch, 25);
        assert_eq!(cfg.trials, 5);
        assert_eq!(cfg.dataset, "3T3_all_61x61");
        assert_eq!(cfg.experiment, "bn_feature_net_61x61");
        assert_eq!(cfg.model.n_features, 3);
        assert_eq!(cfg.model.n_channels, 2);
        assert_eq!(cfg.model.reg, 1e-5);
        assert_eq!(cfg.optimizer.lr, 0.01);
        assert_eq!(cfg.optimizer.decay, 1e-6);
        assert_eq!(cfg.schedule.decay, 0.95);
        assert!(cfg.augmentation.rotate && cfg.augmentation.flip && !cfg.augmentation.shear);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: TrainingConfig = toml_from_str(
            r#"
            n_epoch = 3
            [optimizer]
            momentum = 0.5
            "#,
        );
        assert_eq!(cfg.n_epoch, 3);
        assert_eq!(cfg.batch_size, 256);
        assert_eq!(cfg.optimizer.momentum, 0.5);
        assert_eq!(cfg.optimizer.lr, 0.01);
        assert!(cfg.optimizer.nesterov);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let cfg = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CellnetError::Config(_))));
    }

    #[test]
    fn test_ledger_path() {
        let cfg = TrainingConfig {
            save_dir: PathBuf::from("/tmp/nets"),
            ..TrainingConfig::default()
        };
        assert_eq!(
            cfg.ledger_path(),
            PathBuf::from("/tmp/nets/bn_feature_net_61x61_trials.json")
        );
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = load_config(None, Some(Path::new("/nonexistent/cellnet.toml")), None);
        assert!(matches!(result, Err(CellnetError::NotFound(_))));
    }

    fn toml_from_str(s: &str) -> TrainingConfig {
        Figment::from(Serialized::defaults(TrainingConfig::default()))
            .merge(Toml::string(s))
            .extract()
            .unwrap()
    }
}
