// projeto: densefit
// file: src/neural/mod.rs
// Module declarations for the dense regression trainer

pub mod utils;    // Error type, SGD optimizer, schedules and losses
pub mod data;     // Dataset construction, CSV loading and batching
pub mod model;    // Dense layer model, fit and predict
pub mod metrics;  // Training history and regression metrics
pub mod storage;  // Weights and history files

// Re-export commonly used items for convenience
pub use data::Dataset;
pub use model::{DenseModel, FitOptions};
pub use storage::{load_weights, save_history_csv, save_weights};
pub use utils::{LearningRateScheduler, LossKind, SgdOptimizer, TrainingError};
