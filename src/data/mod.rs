pub mod dataset;
pub mod encode;
pub mod split;

pub use dataset::{Dataset, Label};
pub use encode::{argmax, one_hot_encode, FeatureScaler, Normalization};
pub use split::{split_data, DataPartition, Split, DEFAULT_VALIDATION_SPLIT};
