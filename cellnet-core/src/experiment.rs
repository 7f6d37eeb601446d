//! Trial ledger — one record per training trial, persisted next to the artefacts.

use crate::artifacts::TrialArtifacts;
use crate::error::Result;
use crate::metrics::TrainingMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A single training trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: String,
    pub experiment: String,
    pub dataset: String,
    pub trial: u32,
    pub status: TrialStatus,
    /// SHA-256 over every request parameter except the trial index.
    pub fingerprint: String,
    pub artifacts: TrialArtifacts,
    pub layer_count: usize,
    pub trainable_params: usize,
    pub metrics: Option<TrainingMetrics>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrialRecord {
    pub fn new(
        experiment: &str,
        dataset: &str,
        trial: u32,
        fingerprint: String,
        artifacts: TrialArtifacts,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            experiment: experiment.to_string(),
            dataset: dataset.to_string(),
            trial,
            status: TrialStatus::Pending,
            fingerprint,
            artifacts,
            layer_count: 0,
            trainable_params: 0,
            metrics: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: TrialStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, metrics: TrainingMetrics) {
        self.metrics = Some(metrics);
        self.set_status(TrialStatus::Completed);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.set_status(TrialStatus::Failed);
    }
}

/// Ledger of trials for one experiment, stored as a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentLedger {
    #[serde(skip)]
    path: Option<PathBuf>,
    pub trials: Vec<TrialRecord>,
}

impl ExperimentLedger {
    /// A ledger that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the ledger at `path`, starting empty when the file doesn't exist.
    pub fn open(path: &Path) -> Result<Self> {
        let mut ledger: Self = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        ledger.path = Some(path.to_path_buf());
        Ok(ledger)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or replace a record (matched by id) and persist.
    pub fn upsert(&mut self, record: &TrialRecord) -> Result<()> {
        match self.trials.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => self.trials.push(record.clone()),
        }
        self.save()
    }

    pub fn find(&self, id: &str) -> Option<&TrialRecord> {
        self.trials.iter().find(|t| t.id == id)
    }

    pub fn list_by_status(&self, status: TrialStatus) -> Vec<&TrialRecord> {
        self.trials.iter().filter(|t| t.status == status).collect()
    }

    /// Write the ledger to its file, if it has one.
    ///
    /// The JSON goes to a `.tmp` sibling first and is renamed over the target,
    /// so a crash mid-write never leaves a truncated ledger behind.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(trial: u32) -> TrialRecord {
        let artifacts = TrialArtifacts::new(
            Path::new("/nets"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "ds",
            "expt",
            trial,
        );
        TrialRecord::new("expt", "ds", trial, "abc".to_string(), artifacts)
    }

    #[test]
    fn test_status_transitions() {
        let mut rec = record(0);
        assert_eq!(rec.status, TrialStatus::Pending);
        rec.set_status(TrialStatus::Running);
        rec.complete(TrainingMetrics::default());
        assert_eq!(rec.status, TrialStatus::Completed);
        assert!(rec.metrics.is_some());

        let mut failed = record(1);
        failed.fail("out of memory");
        assert_eq!(failed.status, TrialStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("out of memory"));
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut ledger = ExperimentLedger::in_memory();
        let mut rec = record(0);
        ledger.upsert(&rec).unwrap();
        rec.set_status(TrialStatus::Running);
        ledger.upsert(&rec).unwrap();
        assert_eq!(ledger.trials.len(), 1);
        assert_eq!(ledger.find(&rec.id).unwrap().status, TrialStatus::Running);
    }

    #[test]
    fn test_persisted_ledger_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expt_trials.json");
        let mut ledger = ExperimentLedger::open(&path).unwrap();
        let mut rec = record(3);
        rec.complete(TrainingMetrics::default());
        ledger.upsert(&rec).unwrap();

        let reloaded = ExperimentLedger::open(&path).unwrap();
        assert_eq!(reloaded.trials.len(), 1);
        assert_eq!(reloaded.trials[0].trial, 3);
        assert_eq!(reloaded.list_by_status(TrialStatus::Completed).len(), 1);
        assert_eq!(reloaded.path(), Some(path.as_path()));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("nets").join("expt_trials.json");
        let mut ledger = ExperimentLedger::open(&path).unwrap();
        assert!(ledger.trials.is_empty());
        assert!(!path.exists());

        ledger.upsert(&record(0)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_ledger_is_serde_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expt_trials.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ExperimentLedger::open(&path).unwrap_err();
        assert!(matches!(err, crate::error::CellnetError::Serde(_)));
    }
}
