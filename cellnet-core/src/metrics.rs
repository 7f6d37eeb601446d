//! Training metrics tracking.

use serde::{Deserialize, Serialize};

/// Per-epoch history reported by a training backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingMetrics {
    pub epochs_completed: u32,
    pub loss_history: Vec<f64>,
    pub accuracy_history: Vec<f64>,
    pub val_loss_history: Vec<f64>,
    pub val_accuracy_history: Vec<f64>,
    /// One-based epoch with the lowest (validation) loss.
    pub best_epoch: Option<u32>,
    pub best_loss: Option<f64>,
    pub total_training_time_secs: f64,
}

impl TrainingMetrics {
    pub fn record_epoch(&mut self, loss: f64, accuracy: Option<f64>, val_loss: Option<f64>) {
        self.loss_history.push(loss);
        if let Some(acc) = accuracy {
            self.accuracy_history.push(acc);
        }
        if let Some(vl) = val_loss {
            self.val_loss_history.push(vl);
        }
        self.epochs_completed += 1;

        let check_loss = val_loss.unwrap_or(loss);
        let improved = match self.best_loss {
            None => true,
            Some(best) => check_loss < best,
        };
        if improved {
            self.best_loss = Some(check_loss);
            self.best_epoch = Some(self.epochs_completed);
        }
    }

    /// Fill in `epochs_completed` and the best epoch when a backend only
    /// reported raw histories.
    pub fn normalize(mut self) -> Self {
        let epochs = self.loss_history.len() as u32;
        if self.epochs_completed == 0 {
            self.epochs_completed = epochs;
        }
        if self.best_loss.is_none() {
            let tracked = if self.val_loss_history.is_empty() {
                &self.loss_history
            } else {
                &self.val_loss_history
            };
            let best = tracked
                .iter()
                .enumerate()
                .map(|(idx, loss)| (idx, *loss))
                .filter(|(_, loss)| loss.is_finite())
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            if let Some((idx, loss)) = best {
                self.best_epoch = Some(idx as u32 + 1);
                self.best_loss = Some(loss);
            }
        }
        self
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}
