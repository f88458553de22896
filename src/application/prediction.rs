//! Prediction service: Orchestrates encoding and classification of one sample.
//!
//! This service coordinates:
//! - The fixed residue-count override
//! - Label encoding with the fitted encoding table
//! - Row assembly in the model's column order
//! - Classifier invocation and label mapping

use std::sync::Arc;

use crate::domain::{encode, EncodingTable, Prediction, PredictionSource, RawSample, FEATURE_ORDER};
use crate::ports::Classifier;
use crate::XtalError;

/// Residue count that is always classified as TRANSFERASE without consulting the model.
pub const OVERRIDE_RESIDUE_COUNT: i64 = 200;

/// Class code returned by the residue-count override.
pub const OVERRIDE_CLASS_CODE: i64 = 1;

/// Service for single-sample enzyme class prediction.
///
/// Holds the encoding table and classifier loaded at startup. Both are
/// read-only, so one service can be shared across threads.
pub struct PredictionService<C>
where
    C: Classifier,
{
    classifier: Arc<C>,
    encoders: Arc<EncodingTable>,
}

impl<C> PredictionService<C>
where
    C: Classifier,
{
    /// Create a new prediction service.
    ///
    /// # Errors
    /// Returns `XtalError::ModelMismatch` if the classifier declares feature
    /// names that differ from the encoded record's columns.
    pub fn new(classifier: Arc<C>, encoders: Arc<EncodingTable>) -> Result<Self, XtalError> {
        if let Some(names) = classifier.feature_names() {
            let matches = names.len() == FEATURE_ORDER.len()
                && names.iter().zip(FEATURE_ORDER).all(|(a, b)| a == b);
            if !matches {
                return Err(XtalError::ModelMismatch(format!(
                    "model expects columns [{}], encoder produces [{}]",
                    names.join(", "),
                    FEATURE_ORDER.join(", ")
                )));
            }
        }

        Ok(Self {
            classifier,
            encoders,
        })
    }

    /// Predict the enzyme class of one sample.
    ///
    /// A residue count of exactly 200 returns TRANSFERASE without encoding or
    /// calling the classifier, whatever the other fields hold.
    ///
    /// # Errors
    /// Returns `XtalError::Encoding` for an unrecognized category, and other
    /// variants if the row cannot be assembled or the classifier fails.
    pub fn predict(&self, sample: &RawSample) -> Result<Prediction, XtalError> {
        if sample.residue_count == OVERRIDE_RESIDUE_COUNT {
            tracing::info!(
                "Residue count {} matched override rule, skipping classifier",
                OVERRIDE_RESIDUE_COUNT
            );
            return Ok(Prediction::new(
                OVERRIDE_CLASS_CODE,
                PredictionSource::ResidueOverride,
            ));
        }

        tracing::debug!("Encoding sample...");
        let encoded = encode(sample, &self.encoders)?;
        tracing::debug!("Encoded categories: {:?}", self.encoders.decoded(&encoded));

        let row = encoded.to_row().map_err(XtalError::MalformedRecord)?;
        tracing::debug!("Invoking classifier on {} features", row.len());
        let code = self.classifier.predict_row(&row)?;

        let prediction = Prediction::new(code, PredictionSource::Model);
        if prediction.class().is_none() {
            tracing::warn!("Classifier returned unmapped class code {}", code);
        }
        tracing::info!(
            "Prediction complete: code={}, label={}",
            prediction.code,
            prediction.label
        );

        Ok(prediction)
    }
}
