// projeto: densefit
// file: src/neural/model.rs
// Dense layer regression model: initialisation, training loop and inference

use chrono::Utc;
use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use crate::neural::data::Dataset;
use crate::neural::metrics::{calculate_regression_metrics, MetricsTracker, RegressionMetrics, TrainingMetrics};
use crate::neural::utils::{validate_input_data, LearningRateScheduler, LossKind, SgdOptimizer, TrainingError};

const KERNEL_PARAM: &str = "dense/kernel";
const BIAS_PARAM: &str = "dense/bias";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerWeights {
    pub kernel: Array2<f64>,  // units x input_dim
    pub bias: Array1<f64>,    // units
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub input_dim: usize,
    pub units: usize,
    pub layer: DenseLayerWeights,
    pub loss: Option<LossKind>,
    pub epochs_trained: usize,
    pub final_loss: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
    pub scheduler: Option<LearningRateScheduler>,
    pub patience: Option<usize>,
    pub min_delta: f64,
    pub log_every: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            epochs: 500,
            batch_size: 32,
            shuffle: true,
            scheduler: None,
            patience: None,
            min_delta: 0.0,
            log_every: 50,
        }
    }
}

pub struct DenseModel {
    input_dim: usize,
    units: usize,
    layer: DenseLayerWeights,
    optimizer: Option<SgdOptimizer>,
    loss: Option<LossKind>,
    epochs_trained: usize,
    last_loss: Option<f64>,
}

impl DenseModel {
    /// Glorot-uniform kernel, zero bias.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, units: usize, rng: &mut R) -> Result<Self, TrainingError> {
        if input_dim == 0 || units == 0 {
            return Err(TrainingError::ModelConfiguration(format!(
                "dense layer needs input_dim and units >= 1, got {} and {}",
                input_dim, units
            )));
        }

        let limit = (6.0 / (input_dim + units) as f64).sqrt();
        let dist = Uniform::new(-limit, limit)
            .map_err(|e| TrainingError::ModelConfiguration(e.to_string()))?;

        let layer = DenseLayerWeights {
            kernel: Array2::from_shape_fn((units, input_dim), |_| dist.sample(&mut *rng)),
            bias: Array1::zeros(units),
        };

        let model = DenseModel {
            input_dim,
            units,
            layer,
            optimizer: None,
            loss: None,
            epochs_trained: 0,
            last_loss: None,
        };

        debug!("🛠️ [Model] Dense({} -> {}) initialized with {} parameters",
               input_dim, units, model.num_parameters());
        Ok(model)
    }

    pub fn from_weights(weights: ModelWeights) -> Result<Self, TrainingError> {
        let ModelWeights { input_dim, units, layer, loss, epochs_trained, final_loss, .. } = weights;

        if layer.kernel.dim() != (units, input_dim) || layer.bias.len() != units {
            return Err(TrainingError::Shape(format!(
                "stored kernel {:?} / bias {} do not match Dense({} -> {})",
                layer.kernel.dim(),
                layer.bias.len(),
                input_dim,
                units
            )));
        }
        validate_input_data(&layer.kernel.view(), "kernel")?;
        validate_input_data(&layer.bias.view().insert_axis(Axis(0)), "bias")?;

        Ok(DenseModel {
            input_dim,
            units,
            layer,
            optimizer: None,
            loss,
            epochs_trained,
            last_loss: final_loss,
        })
    }

    /// Optimizer state carried in from earlier use is cleared.
    pub fn compile(&mut self, mut optimizer: SgdOptimizer, loss: LossKind) {
        optimizer.reset();
        info!("⚙️ [Model] Compiled with SGD(lr={}, momentum={}, nesterov={}) and {:?}",
              optimizer.learning_rate, optimizer.momentum, optimizer.nesterov, loss);
        self.optimizer = Some(optimizer);
        self.loss = Some(loss);
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn kernel(&self) -> &Array2<f64> {
        &self.layer.kernel
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.layer.bias
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    pub fn num_parameters(&self) -> usize {
        self.layer.kernel.len() + self.layer.bias.len()
    }

    pub fn forward(&self, inputs: &Array2<f64>) -> Result<Array2<f64>, TrainingError> {
        if inputs.ncols() != self.input_dim {
            return Err(TrainingError::Shape(format!(
                "expected {} input columns, got {}",
                self.input_dim,
                inputs.ncols()
            )));
        }
        Ok(inputs.dot(&self.layer.kernel.t()) + &self.layer.bias)
    }

    /// One optimizer step on a batch. Returns the loss measured before the update.
    pub fn train_step(&mut self, batch_x: &Array2<f64>, batch_y: &Array2<f64>) -> Result<f64, TrainingError> {
        let loss_kind = self.loss.ok_or_else(not_compiled)?;

        let predictions = self.forward(batch_x)?;
        if predictions.dim() != batch_y.dim() {
            return Err(TrainingError::Shape(format!(
                "predictions {:?} and targets {:?} differ",
                predictions.dim(),
                batch_y.dim()
            )));
        }

        let loss = loss_kind.value(&predictions, batch_y);
        let grad_out = loss_kind.gradient(&predictions, batch_y);
        let grad_kernel = grad_out.t().dot(batch_x);
        let grad_bias = grad_out.sum_axis(Axis(0));

        let optimizer = self.optimizer.as_mut().ok_or_else(not_compiled)?;
        optimizer.update(KERNEL_PARAM, &mut self.layer.kernel, &grad_kernel)?;
        optimizer.update(BIAS_PARAM, &mut self.layer.bias, &grad_bias)?;

        Ok(loss)
    }

    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        dataset: &Dataset,
        options: &FitOptions,
        rng: &mut R,
    ) -> Result<MetricsTracker, TrainingError> {
        if self.optimizer.is_none() || self.loss.is_none() {
            return Err(not_compiled());
        }
        if dataset.is_empty() {
            return Err(TrainingError::DataProcessing("cannot fit on an empty dataset".to_string()));
        }
        if dataset.input_dim() != self.input_dim || dataset.output_dim() != self.units {
            return Err(TrainingError::Shape(format!(
                "dataset is {} -> {}, model is Dense({} -> {})",
                dataset.input_dim(),
                dataset.output_dim(),
                self.input_dim,
                self.units
            )));
        }
        if let Some(scheduler) = &options.scheduler {
            scheduler.validate()?;
        }

        let mut tracker = MetricsTracker::with_min_delta(options.min_delta);
        let log_every = options.log_every.max(1);
        let n = dataset.len() as f64;

        info!("🎓 [Model] Training for {} epochs on {} samples", options.epochs, dataset.len());

        for epoch in 1..=options.epochs {
            let learning_rate = {
                let optimizer = self.optimizer.as_mut().ok_or_else(not_compiled)?;
                if let Some(scheduler) = &options.scheduler {
                    optimizer.set_learning_rate(scheduler.get_rate(epoch - 1));
                }
                optimizer.learning_rate
            };

            let mut weighted_loss = 0.0;
            for batch in dataset.batches(options.batch_size, options.shuffle, &mut *rng)? {
                let (batch_x, batch_y) = dataset.select(&batch);
                weighted_loss += self.train_step(&batch_x, &batch_y)? * batch.len() as f64;
            }
            let loss = weighted_loss / n;

            if !loss.is_finite() {
                return Err(TrainingError::Training(format!(
                    "loss diverged to {} at epoch {} (learning rate {})",
                    loss, epoch, learning_rate
                )));
            }

            if epoch == 1 || epoch % log_every == 0 || epoch == options.epochs {
                info!("📈 Epoch {}/{}: loss={:.6} lr={:.6}", epoch, options.epochs, loss, learning_rate);
            } else {
                debug!("Epoch {}/{}: loss={:.6}", epoch, options.epochs, loss);
            }

            self.epochs_trained += 1;
            self.last_loss = Some(loss);

            let should_stop = tracker.add_metrics(
                TrainingMetrics {
                    epoch,
                    loss,
                    learning_rate,
                    timestamp: Utc::now().to_rfc3339(),
                },
                options.patience,
            );

            if should_stop {
                info!("⏹️ Early stopping at epoch {} (best loss {:.6} at epoch {})",
                      epoch, tracker.best_loss, tracker.best_epoch);
                break;
            }
        }

        Ok(tracker)
    }

    pub fn predict(&self, inputs: &Array2<f64>) -> Result<Array2<f64>, TrainingError> {
        validate_input_data(&inputs.view(), "prediction input")?;
        self.forward(inputs)
    }

    pub fn predict_one(&self, input: &[f64]) -> Result<Vec<f64>, TrainingError> {
        let inputs = Array2::from_shape_vec((1, input.len()), input.to_vec())?;
        Ok(self.predict(&inputs)?.row(0).to_vec())
    }

    pub fn evaluate(&self, dataset: &Dataset) -> Result<RegressionMetrics, TrainingError> {
        let predictions = self.forward(dataset.inputs())?;
        let predictions: Vec<f64> = predictions.iter().copied().collect();
        let targets: Vec<f64> = dataset.targets().iter().copied().collect();
        Ok(calculate_regression_metrics(&predictions, &targets))
    }

    pub fn get_weights(&self) -> ModelWeights {
        ModelWeights {
            input_dim: self.input_dim,
            units: self.units,
            layer: self.layer.clone(),
            loss: self.loss,
            epochs_trained: self.epochs_trained,
            final_loss: self.last_loss,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

fn not_compiled() -> TrainingError {
    TrainingError::Training("model must be compiled before training".to_string())
}
