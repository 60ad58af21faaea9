// projeto: densefit
// file: src/config.rs
// Configuration for training and prediction runs

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::neural::{FitOptions, LearningRateScheduler, LossKind, SgdOptimizer, TrainingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub data: DataConfig,
    pub prediction: PredictionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub input_dim: usize,
    pub units: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub momentum: f64,
    pub nesterov: bool,
    pub loss: LossKind,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub patience: Option<usize>,
    pub min_delta: f64,
    pub log_every: usize,
    pub scheduler: Option<LearningRateScheduler>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV to train on instead of the built-in pairs.
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub inputs: Vec<Vec<f64>>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig { input_dim: 1, units: 1 }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 500,
            batch_size: 32,
            learning_rate: 0.01,
            momentum: 0.0,
            nesterov: false,
            loss: LossKind::MeanSquaredError,
            shuffle: true,
            seed: None,
            patience: None,
            min_delta: 0.0,
            log_every: 50,
            scheduler: None,
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            inputs: vec![vec![11.0], vec![6.0]],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
            data: DataConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }
}

impl Config {
    /// Without a path the defaults are used. A path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, TrainingError> {
        let Some(path) = path else {
            info!("⚙️ No configuration file given, using defaults");
            return Ok(Config::default());
        };

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("⚙️ Configuration loaded from: {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainingError> {
        let config_toml = toml::to_string_pretty(self)?;
        fs::write(path, config_toml)?;
        info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.model.input_dim == 0 || self.model.units == 0 {
            return Err(TrainingError::Config("model.input_dim and model.units must be at least 1".into()));
        }

        let t = &self.training;
        if t.epochs == 0 {
            return Err(TrainingError::Config("training.epochs must be greater than zero".into()));
        }
        if t.batch_size == 0 {
            return Err(TrainingError::Config("training.batch_size must be greater than zero".into()));
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return Err(TrainingError::Config(format!(
                "training.learning_rate must be positive, got {}", t.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&t.momentum) {
            return Err(TrainingError::Config(format!(
                "training.momentum must be in [0, 1), got {}", t.momentum
            )));
        }
        if t.min_delta < 0.0 {
            return Err(TrainingError::Config("training.min_delta cannot be negative".into()));
        }
        if let Some(scheduler) = &t.scheduler {
            scheduler.validate()?;
        }

        for (i, input) in self.prediction.inputs.iter().enumerate() {
            if input.len() != self.model.input_dim {
                return Err(TrainingError::Config(format!(
                    "prediction input #{} has {} values, model expects {}",
                    i + 1,
                    input.len(),
                    self.model.input_dim
                )));
            }
        }

        Ok(())
    }

    pub fn optimizer(&self) -> SgdOptimizer {
        SgdOptimizer::new(self.training.learning_rate, self.training.momentum, self.training.nesterov)
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            epochs: self.training.epochs,
            batch_size: self.training.batch_size,
            shuffle: self.training.shuffle,
            scheduler: self.training.scheduler.clone(),
            patience: self.training.patience,
            min_delta: self.training.min_delta,
            log_every: self.training.log_every,
        }
    }

    pub fn print_summary(&self) {
        info!("📋 Configuration summary:");
        info!("  🧠 Model: Dense({} -> {})", self.model.input_dim, self.model.units);
        info!("  🎓 Training: epochs={}, batch_size={}, lr={}, momentum={}, loss={:?}",
              self.training.epochs, self.training.batch_size, self.training.learning_rate,
              self.training.momentum, self.training.loss);
        match &self.data.csv_path {
            Some(path) => info!("  📁 Data: {}", path.display()),
            None => info!("  📁 Data: built-in pairs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = Config::default();
        assert_eq!(config.training.epochs, 500);
        assert_eq!(config.training.learning_rate, 0.01);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.training.loss, LossKind::MeanSquaredError);
        assert_eq!(config.prediction.inputs, vec![vec![11.0], vec![6.0]]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(Config::load(None).unwrap(), Config::default());

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(Some(dir.path().join("absent.toml").as_path())),
            Err(TrainingError::Io(_))
        ));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[training]\nepochs = 50\nloss = \"mean_absolute_error\"\n\n[training.scheduler]\nkind = \"exponential_decay\"\ninitial_rate = 0.02\ndecay_rate = 0.99\n",
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.training.epochs, 50);
        assert_eq!(config.training.loss, LossKind::MeanAbsoluteError);
        assert_eq!(config.training.learning_rate, 0.01);
        assert_eq!(
            config.training.scheduler,
            Some(LearningRateScheduler::ExponentialDecay { initial_rate: 0.02, decay_rate: 0.99 })
        );
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.training.seed = Some(42);
        config.training.patience = Some(5);
        config.data.csv_path = Some(PathBuf::from("data/points.csv"));
        config.save(&path).unwrap();

        assert_eq!(Config::load(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_example_file_parses() {
        let config: Config = toml::from_str(include_str!("../densefit.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.training.seed, Some(42));
        assert_eq!(config.prediction, PredictionConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[training\nepochs = ").unwrap();
        assert!(matches!(Config::load(Some(path.as_path())), Err(TrainingError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.training.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.momentum = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.prediction.inputs = vec![vec![1.0, 2.0]];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.input_dim = 2;
        config.prediction.inputs = vec![vec![1.0, 2.0]];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fit_options_follow_config() {
        let mut config = Config::default();
        config.training.epochs = 10;
        config.training.patience = Some(2);
        let options = config.fit_options();
        assert_eq!(options.epochs, 10);
        assert_eq!(options.patience, Some(2));
        assert_eq!(config.optimizer().learning_rate, 0.01);
    }
}
