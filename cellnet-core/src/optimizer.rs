//! Stochastic gradient descent settings.

use crate::error::{CellnetError, Result};
use serde::{Deserialize, Serialize};

/// SGD with time-based decay and optional Nesterov momentum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdConfig {
    #[serde(default = "default_lr")]
    pub lr: f64,
    /// Per-iteration decay: the step size at update `t` is `lr / (1 + decay * t)`.
    #[serde(default = "default_decay")]
    pub decay: f64,
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    #[serde(default = "default_true")]
    pub nesterov: bool,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            lr: default_lr(),
            decay: default_decay(),
            momentum: default_momentum(),
            nesterov: true,
        }
    }
}

fn default_lr() -> f64 {
    0.01
}

fn default_decay() -> f64 {
    1e-6
}

fn default_momentum() -> f64 {
    0.9
}

fn default_true() -> bool {
    true
}

impl SgdConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(CellnetError::config(format!(
                "optimizer.lr must be positive, got {}",
                self.lr
            )));
        }
        if !(self.decay.is_finite() && self.decay >= 0.0) {
            return Err(CellnetError::config(format!(
                "optimizer.decay must be non-negative, got {}",
                self.decay
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(CellnetError::config(format!(
                "optimizer.momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        if self.nesterov && self.momentum == 0.0 {
            return Err(CellnetError::config(
                "optimizer.nesterov requires a non-zero momentum",
            ));
        }
        Ok(())
    }

    /// Step size after `iterations` parameter updates, starting from `base`.
    ///
    /// `base` is normally the epoch rate from the learning-rate schedule, which
    /// replaces `lr` at the start of every epoch.
    pub fn decayed_rate(&self, base: f64, iterations: u64) -> f64 {
        base / (1.0 + self.decay * iterations as f64)
    }

    /// Step size after `iterations` updates with no schedule applied.
    pub fn learning_rate_at(&self, iterations: u64) -> f64 {
        self.decayed_rate(self.lr, iterations)
    }
}
