pub mod batch;
pub mod metrics;
pub mod session;
pub mod train_config;

pub use batch::{evaluate, train_batch, BatchOutcome, Evaluation};
pub use metrics::MetricsSnapshot;
pub use session::{RunStatus, TrainEvent, TrainingSession};
pub use train_config::{EarlyStopping, TaskKind, TrainingConfig};
