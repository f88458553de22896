//! Classifier port: Trait for the pre-trained enzyme class model.
//!
//! This trait abstracts the model format from the encode/override logic.

/// Error type for classifier invocations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Feature {index} is not a finite number")]
    NonFinite { index: usize },

    #[error("Model evaluation failed: {0}")]
    Model(String),
}

/// A trained classifier evaluated one row at a time.
///
/// Implementations must be stateless per call: the same row always yields the
/// same class code.
pub trait Classifier: Send + Sync {
    /// Predict the class code for a single feature row.
    ///
    /// # Arguments
    /// * `features` - Numeric features in the model's fixed column order
    ///
    /// # Errors
    /// Returns `ClassifierError::FeatureCount` if the row has the wrong width.
    fn predict_row(&self, features: &[f64]) -> Result<i64, ClassifierError>;

    /// Column names the model was fitted on, if the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}
