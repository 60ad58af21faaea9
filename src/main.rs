// projeto: densefit
// file: src/main.rs
// Trains a single dense unit with SGD on (x, y) pairs and prints predictions

mod config;
mod neural;

use clap::Parser;
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use crate::config::Config;
use crate::neural::{
    load_weights, save_history_csv, save_weights, Dataset, DenseModel, TrainingError,
};

#[derive(Parser, Debug)]
#[command(
    name = "densefit",
    version,
    about = "Fits a one-unit dense layer with SGD and mean squared error, then predicts new inputs",
    long_about = "Trains Dense(units=1) on seven built-in (x, y) pairs or on a CSV file, using plain SGD \
                  and mean squared error, and prints one prediction per input. Every flag overrides the \
                  matching key of the TOML configuration file."
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// SGD learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// SGD momentum (0 disables it)
    #[arg(long)]
    momentum: Option<f64>,

    /// Samples per mini-batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Seed for weight initialisation and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many epochs without improvement
    #[arg(long)]
    patience: Option<usize>,

    /// CSV with input columns followed by target columns
    #[arg(long, value_name = "CSV")]
    data: Option<PathBuf>,

    /// Input to predict, comma-separated when the model has several inputs (repeatable)
    #[arg(long = "predict", value_name = "VALUES")]
    predict: Vec<PredictInput>,

    /// Write the trained weights (.json or .bin)
    #[arg(long, value_name = "PATH")]
    save_weights: Option<PathBuf>,

    /// Skip training and predict with stored weights (.json or .bin)
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = [
            "save_weights", "history_csv", "data", "epochs", "learning_rate",
            "momentum", "batch_size", "seed", "patience",
        ]
    )]
    load_weights: Option<PathBuf>,

    /// Write the per-epoch loss history as CSV
    #[arg(long, value_name = "PATH")]
    history_csv: Option<PathBuf>,

    /// Write the effective configuration as TOML
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct PredictInput(Vec<f64>);

impl FromStr for PredictInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", v.trim()))
            })
            .collect::<Result<Vec<f64>, String>>()
            .map(PredictInput)
    }
}

fn main() -> Result<(), TrainingError> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let start_time = Instant::now();
    info!("🚀 densefit started");

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    match run(&cli, &config) {
        Ok(_) => {
            info!("✅ Finished in {:.2}s", start_time.elapsed().as_secs_f64());
        }
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .init();
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    let training = &mut config.training;
    if let Some(epochs) = cli.epochs {
        training.epochs = epochs;
    }
    if let Some(lr) = cli.learning_rate {
        training.learning_rate = lr;
    }
    if let Some(momentum) = cli.momentum {
        training.momentum = momentum;
    }
    if let Some(batch_size) = cli.batch_size {
        training.batch_size = batch_size;
    }
    if cli.seed.is_some() {
        training.seed = cli.seed;
    }
    if cli.patience.is_some() {
        training.patience = cli.patience;
    }
    if cli.data.is_some() {
        config.data.csv_path = cli.data.clone();
    }
    if !cli.predict.is_empty() {
        config.prediction.inputs = cli.predict.iter().map(|p| p.0.clone()).collect();
    }
}

fn run(cli: &Cli, config: &Config) -> Result<(), TrainingError> {
    config.print_summary();

    if let Some(path) = &cli.save_config {
        config.save(path)?;
    }

    let model = match &cli.load_weights {
        Some(path) => {
            let model = DenseModel::from_weights(load_weights(path)?)?;
            if model.input_dim() != config.model.input_dim || model.units() != config.model.units {
                return Err(TrainingError::ModelConfiguration(format!(
                    "stored model is Dense({} -> {}), configuration expects Dense({} -> {})",
                    model.input_dim(),
                    model.units(),
                    config.model.input_dim,
                    config.model.units
                )));
            }
            info!("📂 Predicting with stored weights ({} epochs trained)", model.epochs_trained());
            model
        }
        None => train(cli, config)?,
    };

    for input in &config.prediction.inputs {
        let prediction = model.predict_one(input)?;
        println!("x:{}, prediction y: {}", format_input(input), format_prediction(&prediction));
    }

    Ok(())
}

fn train(cli: &Cli, config: &Config) -> Result<DenseModel, TrainingError> {
    let training_start = Instant::now();

    let mut rng = match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let dataset = match &config.data.csv_path {
        Some(path) => Dataset::from_csv(path, config.model.input_dim, config.model.units)?,
        None => {
            if (config.model.input_dim, config.model.units) != (1, 1) {
                return Err(TrainingError::ModelConfiguration(
                    "the built-in pairs are one input to one target; set data.csv_path for other shapes".to_string(),
                ));
            }
            Dataset::hello()?
        }
    };

    let mut model = DenseModel::new(config.model.input_dim, config.model.units, &mut rng)?;
    model.compile(config.optimizer(), config.training.loss);

    let history = model.fit(&dataset, &config.fit_options(), &mut rng)?;
    history.print_summary();

    let evaluation = model.evaluate(&dataset)?;
    info!("📊 Training set ({} samples): MSE={:.6} | RMSE={:.6} | MAE={:.6} | R²={:.6} | max error={:.6}",
          evaluation.n_samples, evaluation.mse, evaluation.rmse, evaluation.mae,
          evaluation.r_squared, evaluation.max_error);
    info!("🔍 Kernel {} | bias {}", model.kernel(), model.bias());

    if let Some(path) = &cli.history_csv {
        save_history_csv(path, &history)?;
    }
    if let Some(path) = &cli.save_weights {
        save_weights(path, &model.get_weights())?;
    }

    info!("⏱️ Training finished in {:.2}s", training_start.elapsed().as_secs_f64());
    Ok(model)
}

fn format_input(input: &[f64]) -> String {
    input
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(",")
}

/// One row in the same shape `predict` returns, e.g. `[[8.99]]`.
fn format_prediction(values: &[f64]) -> String {
    let row = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[[{}]]", row)
}
