use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::{Dataset, Label};

/// Default fraction of samples held out for validation.
pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.2;

/// One side of a train/validation partition: parallel feature/label arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<Label>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Train and validation splits produced once at run start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPartition {
    pub train: Split,
    pub validation: Split,
}

/// Shuffles `dataset` and splits off `floor(n * validation_split)` samples
/// for validation; the rest become the training split.
///
/// The same `seed` always yields the same partition. With `None` the order
/// comes from OS entropy.
pub fn split_data(dataset: &Dataset, validation_split: f64, seed: Option<u64>) -> DataPartition {
    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let val_count = ((n as f64) * validation_split.clamp(0.0, 1.0)).floor() as usize;
    // Never leave the training split empty.
    let val_count = val_count.min(n.saturating_sub(1));
    let (val_idx, train_idx) = indices.split_at(val_count);

    DataPartition {
        train: gather(dataset, train_idx),
        validation: gather(dataset, val_idx),
    }
}

fn gather(dataset: &Dataset, indices: &[usize]) -> Split {
    Split {
        features: indices.iter().map(|&i| dataset.features[i].clone()).collect(),
        labels: indices.iter().map(|&i| dataset.labels[i].clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(n: usize) -> Dataset {
        Dataset::from_scalar_labels(
            (0..n).map(|i| vec![i as f64]).collect(),
            (0..n).map(|i| i as f64).collect(),
        )
    }

    #[test]
    fn same_seed_gives_same_partition() {
        let ds = counting(50);
        assert_eq!(split_data(&ds, 0.2, Some(7)), split_data(&ds, 0.2, Some(7)));
        assert_ne!(split_data(&ds, 0.2, Some(7)), split_data(&ds, 0.2, Some(8)));
    }

    #[test]
    fn default_split_is_eighty_twenty_and_covers_every_sample() {
        let ds = counting(10);
        let part = split_data(&ds, DEFAULT_VALIDATION_SPLIT, Some(1));
        assert_eq!(part.train.len(), 8);
        assert_eq!(part.validation.len(), 2);

        let mut seen: Vec<f64> = part.train.features.iter()
            .chain(part.validation.features.iter())
            .map(|row| row[0])
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn features_stay_paired_with_their_labels() {
        let part = split_data(&counting(20), 0.25, Some(3));
        for split in [&part.train, &part.validation] {
            for (row, label) in split.features.iter().zip(&split.labels) {
                assert_eq!(Label::Scalar(row[0]), *label);
            }
        }
    }

    #[test]
    fn zero_split_keeps_everything_for_training() {
        let part = split_data(&counting(4), 0.0, None);
        assert_eq!(part.train.len(), 4);
        assert!(part.validation.is_empty());
    }
}
