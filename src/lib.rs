pub mod error;
pub mod activation;
pub mod loss;
pub mod optim;
pub mod data;
pub mod network;
pub mod propagation;
pub mod train;
pub mod worker;

// Convenience re-exports
pub use error::{Result, TrainError};
pub use activation::ActivationFunction;
pub use loss::LossType;
pub use optim::{OptimizerKind, OptimizerState};
pub use data::{Dataset, Label};
pub use network::{compile, CompiledNetwork, LayerGraph};
pub use propagation::{backward, forward};
pub use train::{MetricsSnapshot, RunStatus, TaskKind, TrainingConfig, TrainingSession};
pub use worker::{Command, Engine, EngineOptions, Notification};
