//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the prediction logic and the model artifact.

mod classifier;

pub use classifier::{Classifier, ClassifierError};
