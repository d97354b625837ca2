use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};

/// A training label: a class index / regression value, or a full target vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Scalar(f64),
    Vector(Vec<f64>),
}

/// Labelled samples handed to the engine: one feature row per label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<Label>,
}

impl Dataset {
    /// Builds a dataset whose labels are all scalars.
    pub fn from_scalar_labels(features: Vec<Vec<f64>>, labels: Vec<f64>) -> Dataset {
        Dataset {
            features,
            labels: labels.into_iter().map(Label::Scalar).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Width of each feature row (0 for an empty dataset).
    pub fn feature_width(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Minimal sanity check: non-empty, one label per row, rectangular features.
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(TrainError::InvalidConfig("dataset has no samples".into()));
        }
        if self.features.len() != self.labels.len() {
            return Err(TrainError::ShapeMismatch {
                what: "labels",
                expected: self.features.len(),
                got: self.labels.len(),
            });
        }
        let width = self.feature_width();
        if let Some(row) = self.features.iter().find(|row| row.len() != width) {
            return Err(TrainError::ShapeMismatch {
                what: "feature row",
                expected: width,
                got: row.len(),
            });
        }
        Ok(())
    }

    /// The classic four-sample XOR problem.
    pub fn xor() -> Dataset {
        Dataset::from_scalar_labels(
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ],
            vec![0.0, 1.0, 1.0, 0.0],
        )
    }
}
