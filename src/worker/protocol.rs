use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::data::Dataset;
use crate::network::LayerGraph;
use crate::train::{MetricsSnapshot, TrainingConfig};

/// Parameter values keyed by synthetic ids such as `w:L1:0:1`.
pub type ParamMap = BTreeMap<String, f64>;

/// Host → engine messages.
///
/// Serialized as `{"type": "START", ...}`, `{"type": "PAUSE"}` and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Start {
        network: LayerGraph,
        #[serde(default)]
        config: TrainingConfig,
        dataset: Dataset,
    },
    Pause,
    Resume,
    Step,
    Stop,
    Reset,
}

impl Command {
    /// Whether the worker should abandon the tick it is running as soon as
    /// the current batch finishes.
    pub fn interrupts_training(&self) -> bool {
        matches!(self, Command::Pause | Command::Stop | Command::Reset)
    }
}

/// Engine → host messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// Throttled live snapshot of the network.
    Update {
        weights: ParamMap,
        biases: ParamMap,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gradients: Option<ParamMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        activations: Option<ParamMap>,
        metrics: MetricsSnapshot,
    },
    EpochComplete {
        epoch: usize,
        metrics: MetricsSnapshot,
    },
    TrainingComplete {
        #[serde(rename = "finalMetrics")]
        final_metrics: MetricsSnapshot,
    },
    Paused,
    Stopped,
    Error {
        message: String,
    },
}
