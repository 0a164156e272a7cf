//! Reconciliation thresholds.

use serde::{Deserialize, Serialize};
use tender_recon::{MatchSettings, ReconSettings, Tolerances};

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Absolute unit-price difference tolerated before a `price_mismatch`.
    pub price_tolerance: f64,
    /// Absolute quantity difference tolerated before a `quantity_mismatch`.
    pub quantity_tolerance: f64,
    /// Relative price difference above which a mismatch is an error.
    pub price_error_ratio: f64,
    pub min_similarity: f64,
    pub high_confidence: f64,
    pub ambiguity_margin: f64,
    pub max_candidates: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let matching = MatchSettings::default();
        let tolerances = Tolerances::default();
        Self {
            price_tolerance: tolerances.price,
            quantity_tolerance: tolerances.quantity,
            price_error_ratio: tolerances.price_error_ratio,
            min_similarity: matching.min_similarity,
            high_confidence: matching.high_confidence,
            ambiguity_margin: matching.ambiguity_margin,
            max_candidates: matching.max_candidates,
        }
    }
}

impl ReconcileConfig {
    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for negative or non-finite
    /// tolerances, ratios outside `0..=1`, and `max_candidates == 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("reconcile.price_tolerance", self.price_tolerance),
            ("reconcile.quantity_tolerance", self.quantity_tolerance),
            ("reconcile.price_error_ratio", self.price_error_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, format!("must be >= 0, got {value}")));
            }
        }
        for (field, value) in [
            ("reconcile.min_similarity", self.min_similarity),
            ("reconcile.high_confidence", self.high_confidence),
            ("reconcile.ambiguity_margin", self.ambiguity_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be between 0 and 1, got {value}"),
                ));
            }
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::invalid(
                "reconcile.max_candidates",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Engine settings for a reconciliation pass.
    #[must_use]
    pub const fn settings(&self) -> ReconSettings {
        ReconSettings {
            matching: MatchSettings {
                min_similarity: self.min_similarity,
                high_confidence: self.high_confidence,
                ambiguity_margin: self.ambiguity_margin,
                max_candidates: self.max_candidates,
            },
            tolerances: Tolerances {
                price: self.price_tolerance,
                quantity: self.quantity_tolerance,
                price_error_ratio: self.price_error_ratio,
            },
        }
    }
}
