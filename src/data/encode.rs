use serde::{Serialize, Deserialize};

/// One-hot encodes class indices into rows of length `num_classes`.
///
/// An index outside `0..num_classes` encodes to an all-zero row.
pub fn one_hot_encode(labels: &[usize], num_classes: usize) -> Vec<Vec<f64>> {
    labels.iter()
        .map(|&class| {
            let mut row = vec![0.0; num_classes];
            one_hot_into(class, &mut row);
            row
        })
        .collect()
}

/// Writes the one-hot encoding of `class` into `out` (length = class count).
pub fn one_hot_into(class: usize, out: &mut [f64]) {
    out.iter_mut().for_each(|x| *x = 0.0);
    if let Some(slot) = out.get_mut(class) {
        *slot = 1.0;
    }
}

/// Feature scaling applied at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Normalization {
    #[default]
    None,
    /// Rescales each column to [0, 1].
    MinMax,
    /// Zero mean, unit variance per column.
    Standard,
}

/// Per-column affine transform `x' = (x - offset) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    offsets: Vec<f64>,
    scales: Vec<f64>,
}

impl FeatureScaler {
    /// Fits column statistics on `rows`. Constant columns get scale 1.
    pub fn fit(rows: &[Vec<f64>], method: Normalization) -> FeatureScaler {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;
        let mut offsets = vec![0.0; width];
        let mut scales = vec![1.0; width];

        for col in 0..width {
            let column = rows.iter().map(|row| row[col]);
            let (offset, scale) = match method {
                Normalization::None => (0.0, 1.0),
                Normalization::MinMax => {
                    let (min, max) = column.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                        (lo.min(x), hi.max(x))
                    });
                    (min, max - min)
                }
                Normalization::Standard => {
                    let mean = column.clone().sum::<f64>() / n;
                    let var = column.map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                    (mean, var.sqrt())
                }
            };
            offsets[col] = offset;
            scales[col] = if scale.abs() > f64::EPSILON { scale } else { 1.0 };
        }

        FeatureScaler { offsets, scales }
    }

    /// Scales `rows` in place.
    pub fn apply(&self, rows: &mut [Vec<f64>]) {
        for row in rows {
            for ((x, offset), scale) in row.iter_mut().zip(&self.offsets).zip(&self.scales) {
                *x = (*x - offset) / scale;
            }
        }
    }
}

/// Index of the maximum element in a slice; ties go to the first one.
pub fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, x) in v.iter().enumerate().skip(1) {
        if *x > v[best] {
            best = i;
        }
    }
    best
}
