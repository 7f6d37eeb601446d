//! Per-trial artefact naming.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Files a trial is expected to leave in the save directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialArtifacts {
    /// `{date}_{dataset}_{experiment}_{trial}`
    pub stem: String,
    /// Best weights.
    pub weights: PathBuf,
    /// Loss and accuracy history.
    pub history: PathBuf,
}

impl TrialArtifacts {
    pub fn new(save_dir: &Path, date: NaiveDate, dataset: &str, experiment: &str, trial: u32) -> Self {
        let stem = format!("{}_{dataset}_{experiment}_{trial}", date.format("%Y-%m-%d"));
        Self {
            weights: save_dir.join(format!("{stem}.h5")),
            history: save_dir.join(format!("{stem}.npz")),
            stem,
        }
    }

    /// True when both files exist on disk.
    pub fn exist(&self) -> bool {
        self.weights.exists() && self.history.exists()
    }
}
