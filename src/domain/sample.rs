//! Sample descriptors entered through the prediction form.
//!
//! Based on the deposited crystallography metadata the classifier was fitted on.

use serde::{Deserialize, Serialize};

/// Experimental techniques offered by the form, in display order.
pub static EXPERIMENTAL_TECHNIQUES: [&str; 6] = [
    "X-RAY DIFFRACTION",
    "POWDER DIFFRACTION",
    "X-RAY DIFFRACTION, EPR",
    "EPR, X-RAY DIFFRACTION",
    "NEUTRON DIFFRACTION",
    "ELECTRON CRYSTALLOGRAPHY",
];

/// Macromolecule types offered by the form.
pub static MACROMOLECULE_TYPES: [&str; 4] = ["Protein", "DNA", "RNA", "Protein/DNA Hybrid"];

/// Crystallization methods offered by the form.
pub static CRYSTALLIZATION_METHODS: [&str; 5] = [
    "VAPOR DIFFUSION, HANGING DROP",
    "Batch",
    "Dialysis",
    "Free Interface Diffusion",
    "Lipidic Cubic Phase",
];

/// Chain identifiers offered by the form.
pub static CHAIN_IDS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

/// Column names as they appear in the raw record.
pub mod field {
    pub const EXPERIMENTAL_TECHNIQUE: &str = "experimentalTechnique";
    pub const MACROMOLECULE_TYPE: &str = "macromoleculeType";
    pub const RESOLUTION: &str = "resolution";
    pub const CRYSTALLIZATION_METHOD: &str = "crystallizationMethod";
    pub const CRYSTALLIZATION_TEMP_K: &str = "crystallizationTempK";
    pub const DENSITY_PERCENT_SOL: &str = "densityPercentSol";
    pub const PH_VALUE: &str = "phValue";
    pub const PUBLICATION_YEAR: &str = "publicationYear";
    pub const CHAIN_ID: &str = "chainId";
    pub const SEQUENCE: &str = "sequence";
    pub const RESIDUE_COUNT: &str = "residueCount";
}

/// Every categorical field paired with the options the form offers for it.
#[must_use]
pub fn form_options() -> [(&'static str, &'static [&'static str]); 4] {
    [
        (field::EXPERIMENTAL_TECHNIQUE, &EXPERIMENTAL_TECHNIQUES[..]),
        (field::MACROMOLECULE_TYPE, &MACROMOLECULE_TYPES[..]),
        (field::CRYSTALLIZATION_METHOD, &CRYSTALLIZATION_METHODS[..]),
        (field::CHAIN_ID, &CHAIN_IDS[..]),
    ]
}

/// A single raw field value, before encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for RawValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            // Whole floats keep their ".0", as fitted numeric categories are stored.
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Descriptors of one crystallized sample, as entered for a single prediction.
///
/// Categorical fields are kept as strings: values outside the form's lists are
/// representable and are rejected by the encoder, not by the type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    pub experimental_technique: String,
    pub macromolecule_type: String,
    /// Resolution in angstrom (>= 0)
    pub resolution: f64,
    pub crystallization_method: String,
    /// Crystallization temperature in kelvin (>= 0)
    pub crystallization_temp_k: f64,
    /// Solvent content in percent (>= 0)
    pub density_percent_sol: f64,
    /// pH of the crystallization condition (0-14)
    pub ph_value: f64,
    /// Year of the primary citation (1900-2025)
    pub publication_year: i64,
    /// Single-letter chain identifier
    pub chain_id: String,
    /// One-letter residue sequence, may be empty
    pub sequence: String,
    /// Number of residues in the chain (>= 1)
    pub residue_count: i64,
}

impl Default for RawSample {
    /// The record a freshly opened form produces.
    fn default() -> Self {
        Self {
            experimental_technique: EXPERIMENTAL_TECHNIQUES[0].to_string(),
            macromolecule_type: MACROMOLECULE_TYPES[0].to_string(),
            resolution: 0.0,
            crystallization_method: CRYSTALLIZATION_METHODS[0].to_string(),
            crystallization_temp_k: 0.0,
            density_percent_sol: 0.0,
            ph_value: 0.0,
            publication_year: 1900,
            chain_id: CHAIN_IDS[0].to_string(),
            sequence: String::new(),
            residue_count: 1,
        }
    }
}

impl RawSample {
    /// Fields in record order, paired with their column names.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, RawValue<'_>); 11] {
        [
            (
                field::EXPERIMENTAL_TECHNIQUE,
                RawValue::Text(&self.experimental_technique),
            ),
            (field::MACROMOLECULE_TYPE, RawValue::Text(&self.macromolecule_type)),
            (field::RESOLUTION, RawValue::Float(self.resolution)),
            (
                field::CRYSTALLIZATION_METHOD,
                RawValue::Text(&self.crystallization_method),
            ),
            (
                field::CRYSTALLIZATION_TEMP_K,
                RawValue::Float(self.crystallization_temp_k),
            ),
            (
                field::DENSITY_PERCENT_SOL,
                RawValue::Float(self.density_percent_sol),
            ),
            (field::PH_VALUE, RawValue::Float(self.ph_value)),
            (field::PUBLICATION_YEAR, RawValue::Int(self.publication_year)),
            (field::CHAIN_ID, RawValue::Text(&self.chain_id)),
            (field::SEQUENCE, RawValue::Text(&self.sequence)),
            (field::RESIDUE_COUNT, RawValue::Int(self.residue_count)),
        ]
    }

    /// Check the numeric constraints the form widgets enforce.
    ///
    /// # Errors
    /// Returns every violation found, one message each.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let non_negative = [
            ("Resolution", self.resolution),
            ("Crystallization temperature", self.crystallization_temp_k),
            ("Density percent solvent", self.density_percent_sol),
        ];
        for (label, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{label} {value} must be >= 0"));
            }
        }
        if !(0.0..=14.0).contains(&self.ph_value) {
            errors.push(format!("pH {} out of range [0, 14]", self.ph_value));
        }
        if !(1900..=2025).contains(&self.publication_year) {
            errors.push(format!(
                "Publication year {} out of range [1900, 2025]",
                self.publication_year
            ));
        }
        if self.residue_count < 1 {
            errors.push(format!("Residue count {} must be >= 1", self.residue_count));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_form_defaults() {
        let sample = RawSample::default();
        assert_eq!(sample.experimental_technique, "X-RAY DIFFRACTION");
        assert_eq!(sample.chain_id, "A");
        assert_eq!(sample.publication_year, 1900);
        assert_eq!(sample.residue_count, 1);
        assert!(sample.validate().is_ok());
    }

    #[test]
    fn test_fields_follow_record_order() {
        let sample = RawSample::default();
        let names: Vec<&str> = sample.fields().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "experimentalTechnique",
                "macromoleculeType",
                "resolution",
                "crystallizationMethod",
                "crystallizationTempK",
                "densityPercentSol",
                "phValue",
                "publicationYear",
                "chainId",
                "sequence",
                "residueCount",
            ]
        );
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let invalid = RawSample {
            resolution: -1.0,
            ph_value: 14.5,
            publication_year: 2030,
            residue_count: 0,
            ..Default::default()
        };
        let errors = invalid.validate().expect_err("Should be invalid");
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_raw_value_display() {
        assert_eq!(RawValue::Float(1.0).to_string(), "1.0");
        assert_eq!(RawValue::Float(2.5).to_string(), "2.5");
        assert_eq!(RawValue::Float(-3.0).to_string(), "-3.0");
        assert_eq!(RawValue::Int(7).to_string(), "7");
        assert_eq!(RawValue::Text("A").to_string(), "A");
    }

    #[test]
    fn test_serde_uses_record_column_names() {
        let json = serde_json::to_value(RawSample::default()).expect("serialize");
        assert!(json.get("crystallizationTempK").is_some());
        assert!(json.get("densityPercentSol").is_some());
        assert!(json.get("residueCount").is_some());
    }
}
