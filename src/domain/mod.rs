//! Domain layer: Core types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! Encoding is a pure function of a sample and the fitted encoding table.

pub mod encoding;
mod prediction;
pub mod sample;

pub use encoding::{
    encode, EncodedSample, EncodingError, EncodingTable, FeatureValue, LabelEncoder,
    FEATURE_ORDER,
};
pub use prediction::{ClassLabel, EnzymeClass, Prediction, PredictionSource};
pub use sample::{RawSample, RawValue};
