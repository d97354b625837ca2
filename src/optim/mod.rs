pub mod optimizer;
pub mod updater;

pub use optimizer::{OptimizerKind, OptimizerParams, OptimizerState};
pub use updater::update_parameters;
