// projeto: densefit
// file: src/neural/storage.rs
// Model weights and training history persistence

use log::info;
use std::fs;
use std::path::Path;
use crate::neural::metrics::MetricsTracker;
use crate::neural::model::ModelWeights;
use crate::neural::utils::TrainingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeightsFormat {
    Json,
    Bincode,
}

fn weights_format(path: &Path) -> Result<WeightsFormat, TrainingError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(WeightsFormat::Json),
        Some("bin") => Ok(WeightsFormat::Bincode),
        _ => Err(TrainingError::Serialization(format!(
            "unsupported weights file '{}': use a .json or .bin extension",
            path.display()
        ))),
    }
}

pub fn save_weights<P: AsRef<Path>>(path: P, weights: &ModelWeights) -> Result<(), TrainingError> {
    let path = path.as_ref();

    let bytes = match weights_format(path)? {
        WeightsFormat::Json => serde_json::to_vec_pretty(weights)
            .map_err(|e| TrainingError::Serialization(format!("Failed to serialize weights: {}", e)))?,
        WeightsFormat::Bincode => bincode::serde::encode_to_vec(weights, bincode::config::standard())
            .map_err(|e| TrainingError::Serialization(format!("Failed to serialize weights: {}", e)))?,
    };
    fs::write(path, bytes)?;

    info!("💾 [Storage] Weights saved to {}", path.display());
    info!("   ├── Dense: {} -> {}", weights.input_dim, weights.units);
    info!("   └── Epochs trained: {}", weights.epochs_trained);
    Ok(())
}

pub fn load_weights<P: AsRef<Path>>(path: P) -> Result<ModelWeights, TrainingError> {
    let path = path.as_ref();
    let format = weights_format(path)?;
    let bytes = fs::read(path)?;

    let weights: ModelWeights = match format {
        WeightsFormat::Json => serde_json::from_slice(&bytes)
            .map_err(|e| TrainingError::Serialization(format!("Failed to deserialize weights: {}", e)))?,
        WeightsFormat::Bincode => {
            let (weights, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| TrainingError::Serialization(format!("Failed to deserialize weights: {}", e)))?;
            weights
        }
    };

    info!("📂 [Storage] Weights loaded from {} ({} epochs trained)", path.display(), weights.epochs_trained);
    Ok(weights)
}

pub fn save_history_csv<P: AsRef<Path>>(path: P, tracker: &MetricsTracker) -> Result<(), TrainingError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    for metrics in &tracker.history {
        writer.serialize(metrics)?;
    }
    writer.flush()?;

    info!("📊 [Storage] Training history ({} epochs) saved to {}", tracker.history.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::metrics::TrainingMetrics;
    use crate::neural::model::DenseLayerWeights;
    use crate::neural::utils::LossKind;
    use ndarray::array;

    fn sample_weights() -> ModelWeights {
        ModelWeights {
            input_dim: 2,
            units: 1,
            layer: DenseLayerWeights {
                kernel: array![[0.998, -0.25]],
                bias: array![-1.99],
            },
            loss: Some(LossKind::MeanSquaredError),
            epochs_trained: 500,
            final_loss: Some(1.5e-4),
            timestamp: "2026-10-18T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_json_and_bincode_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let weights = sample_weights();

        for name in ["weights.json", "weights.bin"] {
            let path = dir.path().join(name);
            save_weights(&path, &weights).unwrap();
            assert_eq!(load_weights(&path).unwrap(), weights);
        }
    }

    #[test]
    fn test_trained_weights_round_trip_bit_exact() {
        use crate::neural::data::Dataset;
        use crate::neural::model::{DenseModel, FitOptions};
        use crate::neural::utils::SgdOptimizer;
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::hello().unwrap();

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut model = DenseModel::new(1, 1, &mut rng).unwrap();
            model.compile(SgdOptimizer::new(0.01, 0.0, false), LossKind::MeanSquaredError);
            model.fit(&ds, &FitOptions { epochs: 20, ..FitOptions::default() }, &mut rng).unwrap();
            let weights = model.get_weights();

            for name in ["weights.json", "weights.bin"] {
                let path = dir.path().join(name);
                save_weights(&path, &weights).unwrap();
                let loaded = load_weights(&path).unwrap();
                assert_eq!(loaded.layer.kernel[[0, 0]].to_bits(), weights.layer.kernel[[0, 0]].to_bits());
                assert_eq!(loaded.layer.bias[0].to_bits(), weights.layer.bias[0].to_bits());
                assert_eq!(loaded, weights);
            }
        }

        let values: Vec<f64> = (1..=200).map(|i| (i as f64).sqrt() / 7.0 - 1.0 / i as f64).collect();
        let mut weights = sample_weights();
        weights.input_dim = values.len();
        weights.layer.kernel = ndarray::Array2::from_shape_vec((1, values.len()), values).unwrap();
        let path = dir.path().join("wide.json");
        save_weights(&path, &weights).unwrap();
        assert_eq!(load_weights(&path).unwrap(), weights);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.txt");
        assert!(matches!(
            save_weights(&path, &sample_weights()),
            Err(TrainingError::Serialization(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_weights(dir.path().join("absent.json")),
            Err(TrainingError::Io(_))
        ));
    }

    #[test]
    fn test_history_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        let mut tracker = MetricsTracker::new();
        for epoch in 1..=3 {
            tracker.add_metrics(
                TrainingMetrics {
                    epoch,
                    loss: 1.0 / epoch as f64,
                    learning_rate: 0.01,
                    timestamp: "t".to_string(),
                },
                None,
            );
        }
        save_history_csv(&path, &tracker).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "epoch,loss,learning_rate,timestamp");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("1,1.0,0.01,"));
    }
}
