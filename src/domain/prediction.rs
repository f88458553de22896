//! Prediction result types.
//!
//! Represents the enzyme class returned for one sample.

use serde::{Deserialize, Serialize};

/// Enzyme superfamilies the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnzymeClass {
    Hydrolase,
    Transferase,
    Oxidoreductase,
}

impl EnzymeClass {
    /// Map a classifier output code to its class.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Hydrolase),
            1 => Some(Self::Transferase),
            2 => Some(Self::Oxidoreductase),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Hydrolase => 0,
            Self::Transferase => 1,
            Self::Oxidoreductase => 2,
        }
    }

    /// Short description of the reaction family.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Hydrolase => "Catalyses hydrolysis of chemical bonds",
            Self::Transferase => "Transfers functional groups between molecules",
            Self::Oxidoreductase => "Catalyses electron transfer between molecules",
        }
    }

    /// Get the associated color for TUI display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Hydrolase => (59, 130, 246),       // Blue (#3B82F6)
            Self::Transferase => (16, 185, 129),     // Emerald (#10B981)
            Self::Oxidoreductase => (251, 191, 36), // Amber (#FBBF24)
        }
    }
}

impl std::fmt::Display for EnzymeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hydrolase => write!(f, "HYDROLASE"),
            Self::Transferase => write!(f, "TRANSFERASE"),
            Self::Oxidoreductase => write!(f, "OXIDOREDUCTASE"),
        }
    }
}

/// Label shown for a class code. Codes outside the known table are not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassLabel {
    Known(EnzymeClass),
    Unknown(i64),
}

impl ClassLabel {
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        EnzymeClass::from_code(code).map_or(Self::Unknown(code), Self::Known)
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(class) => write!(f, "{class}"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Where a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionSource {
    /// The classifier was invoked
    Model,
    /// The fixed residue-count rule short-circuited the classifier
    ResidueOverride,
}

impl std::fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "classifier"),
            Self::ResidueOverride => write!(f, "residue-count rule"),
        }
    }
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw class code
    pub code: i64,

    pub label: ClassLabel,

    pub source: PredictionSource,

    /// Timestamp of the prediction
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Prediction {
    #[must_use]
    pub fn new(code: i64, source: PredictionSource) -> Self {
        Self {
            code,
            label: ClassLabel::from_code(code),
            source,
            created_at: chrono::Utc::now(),
        }
    }

    /// The enzyme class, if the code is a known one.
    #[must_use]
    pub fn class(&self) -> Option<EnzymeClass> {
        match self.label {
            ClassLabel::Known(class) => Some(class),
            ClassLabel::Unknown(_) => None,
        }
    }
}
