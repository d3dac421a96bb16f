//! Market parameters, applicant records, and the validation errors shared by the engine.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when market inputs or evaluation settings violate their invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketError {
    #[error("{field} has {actual} entries but the market has {expected} universities")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} must be finite and non-negative (got {value})")]
    InvalidScale { field: &'static str, value: f64 },
    #[error("{field}[{index}] is not finite")]
    NonFiniteValue { field: &'static str, index: usize },
    #[error("at least {required} universities are required (got {available})")]
    InsufficientUniversities { required: usize, available: usize },
    #[error("position {position} is outside a ranking of length {len}")]
    PositionOutOfRange { position: usize, len: usize },
    #[error("application list entry {university} is duplicated or outside 0..{universities}")]
    InvalidApplicationList {
        university: usize,
        universities: usize,
    },
    #[error("{field} is invalid: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

/// Shared parameters of one assignment market.
///
/// `qualities` is index-aligned with university identity; its length is the
/// university count N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Ceiling A of the applicants' aptitude draw, Uniform[0, A].
    pub aptitude_scale: f64,
    /// Quality weighting Q; zero switches the ranking builder to its fallback targets.
    #[serde(default)]
    pub quality_weight: f64,
    /// Ceiling W of the per-university synergy draw, Uniform[0, W].
    pub synergy_scale: f64,
    pub qualities: Vec<f64>,
}

impl Market {
    /// Build and validate a market.
    ///
    /// # Errors
    ///
    /// Returns an error if a scale is negative or non-finite, or a quality is non-finite.
    pub fn new(
        aptitude_scale: f64,
        quality_weight: f64,
        synergy_scale: f64,
        qualities: Vec<f64>,
    ) -> Result<Self, MarketError> {
        let market = Self {
            aptitude_scale,
            quality_weight,
            synergy_scale,
            qualities,
        };
        market.validate()?;
        Ok(market)
    }

    /// Parse a market from JSON without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate scale and quality invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if a scale is negative or non-finite, or a quality is non-finite.
    pub fn validate(&self) -> Result<(), MarketError> {
        check_scale("aptitude_scale", self.aptitude_scale)?;
        check_scale("quality_weight", self.quality_weight)?;
        check_scale("synergy_scale", self.synergy_scale)?;
        check_finite("qualities", &self.qualities)
    }

    /// Number of universities N.
    #[must_use]
    pub fn university_count(&self) -> usize {
        self.qualities.len()
    }

    /// Both draw ceilings are zero, so every applicant is indistinguishable.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.aptitude_scale <= 0.0 && self.synergy_scale <= 0.0
    }

    /// Midpoint of the combined score distribution, (A + W) / 2.
    #[must_use]
    pub fn mean_combined_score(&self) -> f64 {
        (self.aptitude_scale + self.synergy_scale) / 2.0
    }

    /// Desirability of `university` for `applicant`: quality plus synergy.
    #[must_use]
    pub fn desirability(&self, applicant: &Applicant, university: usize) -> f64 {
        self.qualities[university] + applicant.synergy(university)
    }

    /// Check that `applicant` carries one synergy per university.
    ///
    /// # Errors
    ///
    /// Returns an error on a length mismatch, a negative aptitude, or a non-finite synergy.
    pub fn check_applicant(&self, applicant: &Applicant) -> Result<(), MarketError> {
        if applicant.synergies.len() != self.university_count() {
            return Err(MarketError::LengthMismatch {
                field: "synergies",
                expected: self.university_count(),
                actual: applicant.synergies.len(),
            });
        }
        check_scale("aptitude", applicant.aptitude)?;
        check_finite("synergies", &applicant.synergies)
    }
}

/// One applicant: an aptitude scalar and a synergy per university.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    aptitude: f64,
    synergies: Vec<f64>,
}

impl Applicant {
    #[must_use]
    pub const fn new(aptitude: f64, synergies: Vec<f64>) -> Self {
        Self {
            aptitude,
            synergies,
        }
    }

    #[must_use]
    pub const fn aptitude(&self) -> f64 {
        self.aptitude
    }

    #[must_use]
    pub fn synergies(&self) -> &[f64] {
        &self.synergies
    }

    #[must_use]
    pub fn synergy(&self, university: usize) -> f64 {
        self.synergies[university]
    }

    /// Score a university would rank this applicant by: aptitude plus synergy.
    #[must_use]
    pub fn combined_score(&self, university: usize) -> f64 {
        self.aptitude + self.synergies[university]
    }
}

fn check_scale(field: &'static str, value: f64) -> Result<(), MarketError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MarketError::InvalidScale { field, value })
    }
}

fn check_finite(field: &'static str, values: &[f64]) -> Result<(), MarketError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(MarketError::NonFiniteValue { field, index }),
        None => Ok(()),
    }
}
