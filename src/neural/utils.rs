// projeto: densefit
// file: src/neural/utils.rs
// Error type, SGD optimizer, learning-rate schedules and loss functions

use ndarray::{Array, Array2, ArrayD, ArrayView2, Dimension, IxDyn, ShapeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Data processing error: {0}")]
    DataProcessing(String),

    #[error("Model configuration error: {0}")]
    ModelConfiguration(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shape error: {0}")]
    Shape(String),
}

impl From<ShapeError> for TrainingError {
    fn from(err: ShapeError) -> Self {
        TrainingError::Shape(err.to_string())
    }
}

impl From<toml::de::Error> for TrainingError {
    fn from(err: toml::de::Error) -> Self {
        TrainingError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TrainingError {
    fn from(err: toml::ser::Error) -> Self {
        TrainingError::Config(err.to_string())
    }
}

/// Plain stochastic gradient descent with optional (Nesterov) momentum.
///
/// With `momentum == 0.0` the update is `w -= lr * g`. Otherwise a velocity
/// is kept per parameter name: `v = momentum * v - lr * g`, then `w += v`
/// (or `w += momentum * v - lr * g` when `nesterov` is set).
#[derive(Debug, Clone)]
pub struct SgdOptimizer {
    pub learning_rate: f64,
    pub momentum: f64,
    pub nesterov: bool,
    pub(crate) velocities: HashMap<String, ArrayD<f64>>,
}

impl SgdOptimizer {
    pub fn new(learning_rate: f64, momentum: f64, nesterov: bool) -> Self {
        SgdOptimizer {
            learning_rate,
            momentum,
            nesterov,
            velocities: HashMap::new(),
        }
    }

    pub fn set_learning_rate(&mut self, new_lr: f64) {
        self.learning_rate = new_lr;
    }

    pub fn update<D: Dimension>(
        &mut self,
        param_name: &str,
        param: &mut Array<f64, D>,
        gradient: &Array<f64, D>,
    ) -> Result<(), TrainingError> {
        if param.shape() != gradient.shape() {
            return Err(TrainingError::Shape(format!(
                "gradient for '{}' has shape {:?}, parameter has {:?}",
                param_name,
                gradient.shape(),
                param.shape()
            )));
        }

        let lr = self.learning_rate;
        let momentum = self.momentum;

        if momentum == 0.0 {
            param.scaled_add(-lr, gradient);
            return Ok(());
        }

        let grad = gradient.view().into_dyn();
        let velocity = self
            .velocities
            .entry(param_name.to_string())
            .or_insert_with(|| ArrayD::zeros(IxDyn(grad.shape())));

        velocity.mapv_inplace(|v| v * momentum);
        velocity.scaled_add(-lr, &grad);

        let step = if self.nesterov {
            velocity.mapv(|v| v * momentum) - &grad * lr
        } else {
            velocity.clone()
        };

        *param += &step.into_dimensionality::<D>()?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.velocities.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningRateScheduler {
    Constant {
        rate: f64,
    },
    StepDecay {
        initial_rate: f64,
        decay_rate: f64,
        step_size: usize,
    },
    ExponentialDecay {
        initial_rate: f64,
        decay_rate: f64,
    },
    CosineAnnealing {
        initial_rate: f64,
        min_rate: f64,
        cycle_length: usize,
    },
}

impl LearningRateScheduler {
    pub fn get_rate(&self, epoch: usize) -> f64 {
        match self {
            LearningRateScheduler::Constant { rate } => *rate,
            LearningRateScheduler::StepDecay { initial_rate, decay_rate, step_size } => {
                initial_rate * decay_rate.powi((epoch / (*step_size).max(1)) as i32)
            },
            LearningRateScheduler::ExponentialDecay { initial_rate, decay_rate } => {
                initial_rate * decay_rate.powi(epoch as i32)
            },
            LearningRateScheduler::CosineAnnealing { initial_rate, min_rate, cycle_length } => {
                let cycle = (*cycle_length).max(1);
                let progress = (epoch % cycle) as f64 / cycle as f64;
                min_rate + (initial_rate - min_rate) * (1.0 + (std::f64::consts::PI * progress).cos()) / 2.0
            },
        }
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        let ok = match self {
            LearningRateScheduler::Constant { rate } => *rate > 0.0,
            LearningRateScheduler::StepDecay { initial_rate, decay_rate, step_size } => {
                *initial_rate > 0.0 && *decay_rate > 0.0 && *step_size > 0
            },
            LearningRateScheduler::ExponentialDecay { initial_rate, decay_rate } => {
                *initial_rate > 0.0 && *decay_rate > 0.0
            },
            LearningRateScheduler::CosineAnnealing { initial_rate, min_rate, cycle_length } => {
                *initial_rate > 0.0 && *min_rate >= 0.0 && min_rate <= initial_rate && *cycle_length > 0
            },
        };

        if ok {
            Ok(())
        } else {
            Err(TrainingError::Config(format!("invalid learning-rate schedule: {:?}", self)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    MeanSquaredError,
    MeanAbsoluteError,
}

impl LossKind {
    /// Mean over every element of the batch.
    pub fn value(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> f64 {
        let n = predictions.len().max(1) as f64;
        let diff = predictions - targets;
        match self {
            LossKind::MeanSquaredError => diff.mapv(|d| d * d).sum() / n,
            LossKind::MeanAbsoluteError => diff.mapv(f64::abs).sum() / n,
        }
    }

    /// Derivative of `value` with respect to each prediction.
    pub fn gradient(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> Array2<f64> {
        let n = predictions.len().max(1) as f64;
        let diff = predictions - targets;
        match self {
            LossKind::MeanSquaredError => diff.mapv(|d| 2.0 * d / n),
            LossKind::MeanAbsoluteError => diff.mapv(|d| {
                if d > 0.0 {
                    1.0 / n
                } else if d < 0.0 {
                    -1.0 / n
                } else {
                    0.0
                }
            }),
        }
    }
}

pub fn mse_loss(predictions: &[f64], targets: &[f64]) -> f64 {
    assert_eq!(predictions.len(), targets.len());
    let n = predictions.len() as f64;
    predictions.iter().zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>() / n
}

pub fn mae_loss(predictions: &[f64], targets: &[f64]) -> f64 {
    assert_eq!(predictions.len(), targets.len());
    let n = predictions.len() as f64;
    predictions.iter().zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>() / n
}

pub fn validate_input_data(data: &ArrayView2<f64>, name: &str) -> Result<(), TrainingError> {
    if data.is_empty() {
        return Err(TrainingError::DataProcessing(format!("{} is empty", name)));
    }

    for ((i, j), &value) in data.indexed_iter() {
        if value.is_nan() {
            return Err(TrainingError::DataProcessing(
                format!("{} contains NaN at position ({}, {})", name, i, j)
            ));
        }
        if value.is_infinite() {
            return Err(TrainingError::DataProcessing(
                format!("{} contains infinite value at position ({}, {})", name, i, j)
            ));
        }
    }

    Ok(())
}
