//! # xtalclass
//!
//! Enzyme class prediction for crystallized macromolecule samples.
//!
//! This crate provides:
//! - Label encoding of sample descriptors with fitted per-column encoders
//! - A fixed residue-count override and a pluggable classifier port
//! - Terminal UI form for single-sample prediction
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (RawSample, EncodingTable, Prediction) and the pure encoder
//! - `ports`: Trait definitions for external collaborators (Classifier)
//! - `adapters`: Concrete implementations (random forest, artifact loading, log sanitizing)
//! - `application`: The prediction use case
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{ClassLabel, EnzymeClass, Prediction, RawSample};

/// Result type for xtalclass operations
pub type Result<T> = std::result::Result<T, XtalError>;

/// Main error type for xtalclass
#[derive(Debug, thiserror::Error)]
pub enum XtalError {
    #[error("{0}")]
    Encoding(#[from] domain::EncodingError),

    #[error("Classifier invocation failed: {0}")]
    Classifier(#[from] ports::ClassifierError),

    #[error("Malformed encoded record: {0}")]
    MalformedRecord(String),

    #[error("Model does not match the encoded record: {0}")]
    ModelMismatch(String),

    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),
}

/// The two failure kinds a user can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A categorical value has no code in the encoding table
    UnrecognizedCategory,
    /// Anything else
    Unspecified,
}

impl XtalError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Encoding(_) => FailureKind::UnrecognizedCategory,
            _ => FailureKind::Unspecified,
        }
    }
}
