//! Per-epoch learning-rate schedule.

use crate::error::{CellnetError, Result};
use serde::{Deserialize, Serialize};

/// Exponential decay: `rate(epoch) = lr * decay^epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    #[serde(default = "default_lr")]
    pub lr: f64,
    #[serde(default = "default_decay")]
    pub decay: f64,
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self {
            lr: default_lr(),
            decay: default_decay(),
        }
    }
}

fn default_lr() -> f64 {
    0.01
}

fn default_decay() -> f64 {
    0.95
}

impl RateSchedule {
    pub fn new(lr: f64, decay: f64) -> Self {
        Self { lr, decay }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(CellnetError::config(format!(
                "schedule.lr must be positive, got {}",
                self.lr
            )));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(CellnetError::config(format!(
                "schedule.decay must be in (0, 1], got {}",
                self.decay
            )));
        }
        Ok(())
    }

    /// Learning rate for a zero-based epoch.
    pub fn rate(&self, epoch: u32) -> f64 {
        self.lr * self.decay.powi(epoch as i32)
    }

    /// Rates for epochs `0..n_epoch`.
    pub fn rates(&self, n_epoch: u32) -> Vec<f64> {
        (0..n_epoch).map(|e| self.rate(e)).collect()
    }
}
