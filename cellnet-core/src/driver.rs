//! Trial driver — runs N independent training trials with identical
//! hyperparameters and a fresh model each time.
//!
//! Trials run strictly in index order and never overlap: each one is awaited
//! to completion before the next starts. The first error from model
//! construction, training or ledger I/O ends the run; later trials are not
//! attempted.

use crate::artifacts::TrialArtifacts;
use crate::backend::{ModelInfo, TrainRequest, TrainingBackend};
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::experiment::{ExperimentLedger, TrialRecord, TrialStatus};
use crate::naming::NameScope;
use chrono::NaiveDate;
use tracing::{Instrument, debug, info, info_span, warn};

/// Drives repeated training trials through a [`TrainingBackend`].
pub struct TrainingDriver<B: TrainingBackend> {
    config: TrainingConfig,
    backend: B,
    names: NameScope,
    ledger: ExperimentLedger,
    date: Option<NaiveDate>,
}

impl<B: TrainingBackend> TrainingDriver<B> {
    /// Create a driver with an in-memory ledger. The configuration is
    /// validated up front.
    pub fn new(config: TrainingConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            names: NameScope::new(),
            ledger: ExperimentLedger::in_memory(),
            date: None,
        })
    }

    /// Persist trial records to the ledger file in the save directory.
    pub fn with_persistent_ledger(mut self) -> Result<Self> {
        self.ledger = ExperimentLedger::open(&self.config.ledger_path())?;
        Ok(self)
    }

    /// Pin the date used in artefact names instead of today's.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn names(&self) -> &NameScope {
        &self.names
    }

    pub fn ledger(&self) -> &ExperimentLedger {
        &self.ledger
    }

    fn artifact_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn request_for(&self, trial: u32) -> TrainRequest {
        let artifacts = TrialArtifacts::new(
            &self.config.save_dir,
            self.artifact_date(),
            &self.config.dataset,
            &self.config.experiment,
            trial,
        );
        TrainRequest::new(&self.config, trial, artifacts)
    }

    /// The requests `run` would issue, in order, without touching the backend.
    pub fn plan(&self) -> Vec<TrainRequest> {
        (0..self.config.trials).map(|t| self.request_for(t)).collect()
    }

    /// Run every trial in order and return their records.
    pub async fn run(&mut self) -> Result<Vec<TrialRecord>> {
        info!(
            backend = self.backend.name(),
            experiment = %self.config.experiment,
            dataset = %self.config.dataset,
            trials = self.config.trials,
            batch_size = self.config.batch_size,
            n_epoch = self.config.n_epoch,
            "Starting training trials"
        );

        let mut records = Vec::with_capacity(self.config.trials as usize);
        for trial in 0..self.config.trials {
            let span = info_span!("trial", index = trial);
            let record = self.run_trial(trial).instrument(span).await?;
            records.push(record);
        }

        info!(completed = records.len(), "All training trials finished");
        Ok(records)
    }

    /// Build, train and release one model.
    ///
    /// The naming scope is reset before the model is built and again after
    /// training succeeds. On failure the error is returned as-is and the scope
    /// keeps the failed trial's counters.
    pub async fn run_trial(&mut self, trial: u32) -> Result<TrialRecord> {
        self.names.reset();

        let request = self.request_for(trial);
        let fingerprint = request.fingerprint()?;
        debug!(%fingerprint, stem = %request.artifacts.stem, "Prepared trial request");

        let mut record = TrialRecord::new(
            &self.config.experiment,
            &self.config.dataset,
            trial,
            fingerprint,
            request.artifacts.clone(),
        );
        self.ledger.upsert(&record)?;

        let model = match self.backend.build_model(&self.config.model, &mut self.names) {
            Ok(model) => model,
            Err(e) => {
                self.record_failure(&mut record, &e.to_string());
                return Err(e);
            }
        };
        record.layer_count = model.layer_count();
        record.trainable_params = model.trainable_params();
        record.set_status(TrialStatus::Running);
        self.ledger.upsert(&record)?;
        info!(
            layers = record.layer_count,
            trainable_params = record.trainable_params,
            "Model built, training"
        );

        // the backend takes ownership; the model is gone once train returns
        let outcome = match self.backend.train(model, &request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record_failure(&mut record, &e.to_string());
                return Err(e);
            }
        };

        info!(
            epochs = outcome.metrics.epochs_completed,
            best_epoch = ?outcome.metrics.best_epoch,
            best_loss = ?outcome.metrics.best_loss,
            "Trial completed"
        );
        record.complete(outcome.metrics);
        self.ledger.upsert(&record)?;

        self.names.reset();
        debug!(prefixes = self.names.len(), "Naming counters reset");
        Ok(record)
    }

    fn record_failure(&mut self, record: &mut TrialRecord, error: &str) {
        record.fail(error);
        if let Err(e) = self.ledger.upsert(record) {
            warn!(error = %e, "Failed to record trial failure in ledger");
        }
    }
}
