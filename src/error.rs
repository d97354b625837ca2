use std::fmt;

/// Result type used across the training engine.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors raised by the compiler, the propagation engine and the training
/// session.
///
/// Numeric trouble (log of zero, exponent overflow) is never an error; the
/// activation and loss functions clamp their inputs instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainError {
    /// The layer graph cannot be turned into a computation structure.
    Compilation(String),
    /// A vector does not match the width of the layer it is fed to.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// A command needs a compiled network but none is loaded.
    UninitializedRun(&'static str),
    /// The background worker thread could not be started.
    ExecutionContextUnavailable(String),
    /// A training configuration value is out of range.
    InvalidConfig(String),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Compilation(msg) => write!(f, "compilation error: {msg}"),
            TrainError::ShapeMismatch { what, expected, got } => {
                write!(f, "shape mismatch: {what} has length {got}, expected {expected}")
            }
            TrainError::UninitializedRun(cmd) => {
                write!(f, "cannot {cmd}: no network has been compiled for this run")
            }
            TrainError::ExecutionContextUnavailable(msg) => {
                write!(f, "training worker unavailable: {msg}")
            }
            TrainError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for TrainError {}
