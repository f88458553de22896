//! Label encoding of raw samples into classifier-ready records.
//!
//! The encoding table is fitted during training and loaded once at startup.
//! Lookups never guess: an unknown category is an error naming the column and
//! the offending value.

use std::collections::{BTreeMap, HashMap};

use super::sample::{field, form_options, RawSample, RawValue};

/// Column order of the encoded record, as assembled when the model was fitted.
pub const FEATURE_ORDER: [&str; 11] = [
    field::EXPERIMENTAL_TECHNIQUE,
    field::MACROMOLECULE_TYPE,
    field::RESOLUTION,
    field::CRYSTALLIZATION_METHOD,
    field::CRYSTALLIZATION_TEMP_K,
    field::DENSITY_PERCENT_SOL,
    field::PH_VALUE,
    field::PUBLICATION_YEAR,
    field::CHAIN_ID,
    SEQUENCE_LENGTH,
    field::RESIDUE_COUNT,
];

/// Derived column replacing the raw sequence.
pub const SEQUENCE_LENGTH: &str = "sequence_length";

/// Error type for encoding operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("value '{value}' in column '{field}' is not recognized by its label encoder")]
    UnrecognizedCategory { field: String, value: String },
}

/// Bijection between the fitted category strings and their integer codes.
///
/// A class's code is its position in the fitted class list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl LabelEncoder {
    /// Build an encoder from its fitted classes.
    ///
    /// # Errors
    /// Returns error if the list is empty or contains duplicates.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("label encoder has no classes".to_string());
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code as i64).is_some() {
                return Err(format!("duplicate class '{class}'"));
            }
        }

        Ok(Self { classes, codes })
    }

    /// Code for a category, if it was seen during fitting.
    #[must_use]
    pub fn transform(&self, value: &str) -> Option<i64> {
        self.codes.get(value).copied()
    }

    /// Category for a code.
    #[must_use]
    pub fn inverse_transform(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Per-column label encoders. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct EncodingTable {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncodingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the encoder for a column, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, encoder: LabelEncoder) {
        self.encoders.insert(field.into(), encoder);
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&LabelEncoder> {
        self.encoders.get(field)
    }

    /// Columns that have an encoder, in name order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    /// Look up the code for `value` in the encoder of `field`.
    ///
    /// A column without an encoder has no categories, so every value is unrecognized.
    ///
    /// # Errors
    /// Returns `EncodingError::UnrecognizedCategory` if the value was not fitted.
    pub fn encode_value(&self, field: &str, value: &str) -> Result<i64, EncodingError> {
        self.encoders
            .get(field)
            .and_then(|encoder| encoder.transform(value))
            .ok_or_else(|| EncodingError::UnrecognizedCategory {
                field: field.to_string(),
                value: value.to_string(),
            })
    }

    /// Check that every option the form offers has a code.
    ///
    /// # Errors
    /// Returns one message per missing encoder or uncovered option.
    pub fn verify_form_coverage(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (field, options) in form_options() {
            let Some(encoder) = self.encoders.get(field) else {
                errors.push(format!("no label encoder for column '{field}'"));
                continue;
            };
            for option in options {
                if encoder.transform(option).is_none() {
                    errors.push(format!("column '{field}' cannot encode form option '{option}'"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The fitted categories behind the coded columns of `encoded`, in row order.
    #[must_use]
    pub fn decoded<'a>(&'a self, encoded: &EncodedSample) -> Vec<(&'static str, &'a str)> {
        encoded
            .columns()
            .iter()
            .filter_map(|(name, value)| match value {
                FeatureValue::Code(code) => self
                    .get(name)
                    .and_then(|encoder| encoder.inverse_transform(*code))
                    .map(|category| (*name, category)),
                _ => None,
            })
            .collect()
    }
}

/// One encoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Label-encoded category
    Code(i64),
    Int(i64),
    Float(f64),
    /// String column without an encoder, passed through untouched
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value, `None` for text.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Code(v) | Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

/// A sample after encoding: one row of named columns in `FEATURE_ORDER`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSample {
    columns: Vec<(&'static str, FeatureValue)>,
}

impl EncodedSample {
    #[must_use]
    pub fn columns(&self) -> &[(&'static str, FeatureValue)] {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    /// Column names in row order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    /// Assemble the numeric feature row fed to the classifier.
    ///
    /// # Errors
    /// Returns error naming the first column that is not numeric.
    pub fn to_row(&self) -> Result<Vec<f64>, String> {
        self.columns
            .iter()
            .map(|(name, value)| {
                value
                    .as_f64()
                    .ok_or_else(|| format!("column '{name}' is not numeric"))
            })
            .collect()
    }
}

/// Trimmed character count of a sequence; empty input yields 0.
#[must_use]
pub fn sequence_length(sequence: &str) -> usize {
    sequence.trim().chars().count()
}

/// Encode a raw sample with the fitted encoding table.
///
/// - `sequence` becomes `sequence_length`
/// - columns with an encoder are replaced by their code
/// - everything else passes through unchanged
///
/// # Errors
/// Returns `EncodingError::UnrecognizedCategory` for the first value that has no code.
pub fn encode(raw: &RawSample, table: &EncodingTable) -> Result<EncodedSample, EncodingError> {
    let mut columns = Vec::with_capacity(FEATURE_ORDER.len());

    for (name, value) in raw.fields() {
        if name == field::SEQUENCE {
            let length = match value {
                RawValue::Text(s) => sequence_length(s),
                _ => 0,
            };
            columns.push((SEQUENCE_LENGTH, FeatureValue::Int(length as i64)));
            continue;
        }

        let encoded = if table.get(name).is_some() {
            FeatureValue::Code(table.encode_value(name, &value.to_string())?)
        } else {
            match value {
                RawValue::Text(s) => FeatureValue::Text(s.to_string()),
                RawValue::Int(v) => FeatureValue::Int(v),
                RawValue::Float(v) => FeatureValue::Float(v),
            }
        };
        columns.push((name, encoded));
    }

    Ok(EncodedSample { columns })
}
