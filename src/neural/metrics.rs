// projeto: densefit
// file: src/neural/metrics.rs
// Training metrics definitions and calculations

use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub learning_rate: f64,
    pub timestamp: String,
}

/// Per-epoch history of a `fit` call, with early-stopping bookkeeping.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    pub history: Vec<TrainingMetrics>,
    pub best_loss: f64,
    pub best_epoch: usize,
    pub patience_counter: usize,
    pub min_delta: f64,
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTracker {
    pub fn new() -> Self {
        MetricsTracker {
            history: Vec::new(),
            best_loss: f64::INFINITY,
            best_epoch: 0,
            patience_counter: 0,
            min_delta: 0.0,
        }
    }

    pub fn with_min_delta(min_delta: f64) -> Self {
        MetricsTracker {
            min_delta,
            ..Self::new()
        }
    }

    /// Records an epoch. Returns true once `patience` epochs in a row have
    /// failed to improve the best loss by more than `min_delta`.
    pub fn add_metrics(&mut self, metrics: TrainingMetrics, patience: Option<usize>) -> bool {
        let improved = metrics.loss < self.best_loss - self.min_delta;
        if improved {
            self.best_loss = metrics.loss;
            self.best_epoch = metrics.epoch;
            self.patience_counter = 0;
        } else {
            self.patience_counter += 1;
        }

        self.history.push(metrics);

        // An improving epoch never stops training, even with zero patience
        match patience {
            Some(p) if !improved => self.patience_counter >= p,
            _ => false,
        }
    }

    pub fn get_best_metrics(&self) -> Option<&TrainingMetrics> {
        self.history.iter().find(|m| m.epoch == self.best_epoch)
    }

    pub fn get_latest_metrics(&self) -> Option<&TrainingMetrics> {
        self.history.last()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.get_latest_metrics().map(|m| m.loss)
    }

    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }

    pub fn print_summary(&self) {
        let (Some(best), Some(last)) = (self.get_best_metrics(), self.get_latest_metrics()) else {
            info!("📈 [Metrics] No epochs recorded");
            return;
        };
        info!("📈 [Metrics] Training Summary:");
        info!("   ├── Epochs run: {}", self.epochs_run());
        info!("   ├── Best epoch: {}", best.epoch);
        info!("   ├── Best loss: {:.6}", best.loss);
        info!("   └── Final loss: {:.6}", last.loss);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
    pub max_error: f64,
    pub n_samples: usize,
}

/// Calculate comprehensive metrics for model evaluation
pub fn calculate_regression_metrics(predictions: &[f64], targets: &[f64]) -> RegressionMetrics {
    assert_eq!(predictions.len(), targets.len(), "Predictions and targets must have same length");

    let n = predictions.len() as f64;

    let mse = crate::neural::utils::mse_loss(predictions, targets);
    let rmse = mse.sqrt();
    let mae = crate::neural::utils::mae_loss(predictions, targets);

    let target_mean = targets.iter().sum::<f64>() / n;
    let ss_res = predictions.iter().zip(targets.iter())
        .map(|(p, t)| (t - p).powi(2))
        .sum::<f64>();
    let ss_tot = targets.iter()
        .map(|t| (t - target_mean).powi(2))
        .sum::<f64>();
    let r_squared = if ss_tot != 0.0 { 1.0 - (ss_res / ss_tot) } else { 0.0 };

    let max_error = predictions.iter().zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .fold(0.0, f64::max);

    RegressionMetrics {
        mse,
        rmse,
        mae,
        r_squared,
        max_error,
        n_samples: predictions.len(),
    }
}
