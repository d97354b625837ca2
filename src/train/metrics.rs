use serde::{Serialize, Deserialize};

/// Training metrics at one point of a run.
///
/// Emitted after every batch and, with epoch-averaged training values, at
/// the end of every epoch. Accuracy fields are only set for classification
/// tasks; validation fields only when a validation split exists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Batches applied so far in this run.
    pub step: usize,
    /// Completed epochs.
    pub epoch: usize,
    /// Mean training loss (over the batch, or over the epoch).
    pub loss: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_loss: Option<f64>,
    /// Training accuracy as a fraction in [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_accuracy: Option<f64>,
}
