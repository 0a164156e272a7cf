//! Request and import payloads accepted by the service layer.
//!
//! These are the boundary shapes: alert resolution and merge requests coming
//! from callers, and the already-parsed bundles handed over by the external
//! import service. Each payload validates itself before any write happens.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::WbsLevels;
use crate::enums::{AlertStatus, OfferItemOrigin, OfferItemSource};
use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Alert resolution
// ---------------------------------------------------------------------------

/// Body of an alert resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ResolveAlertRequest {
    /// Target status; must be `resolved` or `ignored`.
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub resolution_note: Option<String>,
    #[serde(default)]
    pub resolved_by: Option<String>,
    /// Baseline item chosen by the user for an ambiguous or addendum line.
    #[serde(default)]
    pub selected_price_list_item_id: Option<String>,
    /// Overwrite the offer price with the selected baseline price.
    #[serde(default)]
    pub apply_approved_price: bool,
}

impl ResolveAlertRequest {
    /// Validate the request and return the requested terminal status.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` when `status` is missing or `open`,
    /// when a selection accompanies `ignored`, or when `apply_approved_price`
    /// is set without a selection.
    pub fn validate(&self) -> Result<AlertStatus, CoreError> {
        let status = self
            .status
            .ok_or_else(|| CoreError::Validation("status is required".into()))?;
        if !status.is_terminal() {
            return Err(CoreError::Validation(format!(
                "status must be resolved or ignored, got {status}"
            )));
        }
        match self.selected_price_list_item_id.as_deref() {
            Some(selected) if selected.trim().is_empty() => {
                return Err(CoreError::Validation(
                    "selected_price_list_item_id must not be empty".into(),
                ));
            }
            Some(_) if status != AlertStatus::Resolved => {
                return Err(CoreError::Validation(
                    "selecting a price list item requires status resolved".into(),
                ));
            }
            None if self.apply_approved_price => {
                return Err(CoreError::Validation(
                    "apply_approved_price requires selected_price_list_item_id".into(),
                ));
            }
            _ => {}
        }
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Body of an estimate merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MergeRequest {
    pub estimate_ids: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price_list_name: Option<String>,
    #[serde(default)]
    pub set_as_baseline: bool,
}

impl MergeRequest {
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for fewer than two ids, empty ids, or
    /// repeated ids.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.estimate_ids.len() < 2 {
            return Err(CoreError::Validation(format!(
                "merge requires at least two estimate ids, got {}",
                self.estimate_ids.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for id in &self.estimate_ids {
            if id.trim().is_empty() {
                return Err(CoreError::Validation("estimate id must not be empty".into()));
            }
            if !seen.insert(id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "estimate id {id} listed more than once"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Import bundles
// ---------------------------------------------------------------------------

/// A catalog entry as delivered by the import service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PriceListItemInput {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub price: f64,
}

/// A baseline line as delivered by the import service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EstimateItemInput {
    #[serde(default)]
    pub progressive: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub amount: Option<f64>,
    /// Code of the catalog entry this line prices; resolved at import.
    #[serde(default)]
    pub price_list_code: Option<String>,
    #[serde(flatten)]
    pub wbs: WbsLevels,
}

/// One estimate with its catalog and lines.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EstimateImport {
    pub name: String,
    #[serde(default)]
    pub is_baseline: bool,
    #[serde(default)]
    pub price_list_name: Option<String>,
    #[serde(default)]
    pub price_list: Vec<PriceListItemInput>,
    #[serde(default)]
    pub items: Vec<EstimateItemInput>,
}

impl EstimateImport {
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty name, empty catalog codes,
    /// or non-finite numbers.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("estimate name must not be empty".into()));
        }
        for (idx, entry) in self.price_list.iter().enumerate() {
            if entry.code.is_empty() {
                return Err(CoreError::Validation(format!(
                    "price_list[{idx}]: code must not be empty"
                )));
            }
            ensure_finite(&format!("price_list[{idx}].price"), entry.price)?;
        }
        for (idx, line) in self.items.iter().enumerate() {
            ensure_finite(&format!("items[{idx}].quantity"), line.quantity)?;
            ensure_finite(&format!("items[{idx}].unit_price"), line.unit_price)?;
        }
        Ok(())
    }
}

/// An offer line as delivered by the import service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OfferItemInput {
    #[serde(default = "default_origin")]
    pub origin: OfferItemOrigin,
    #[serde(default = "default_source")]
    pub source: OfferItemSource,
    /// Baseline line number this detailed line answers; resolved at import.
    #[serde(default)]
    pub progressive: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub price_list_item_id: Option<String>,
}

const fn default_origin() -> OfferItemOrigin {
    OfferItemOrigin::Baseline
}

const fn default_source() -> OfferItemSource {
    OfferItemSource::Detailed
}

/// One company's round with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OfferImport {
    pub company: String,
    pub round: u32,
    #[serde(default)]
    pub items: Vec<OfferItemInput>,
}

impl OfferImport {
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty company, round 0, or
    /// non-finite numbers.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.company.trim().is_empty() {
            return Err(CoreError::Validation("company must not be empty".into()));
        }
        if self.round == 0 {
            return Err(CoreError::Validation("round starts at 1".into()));
        }
        for (idx, line) in self.items.iter().enumerate() {
            ensure_finite(&format!("items[{idx}].quantity"), line.quantity)?;
            ensure_finite(&format!("items[{idx}].unit_price"), line.unit_price)?;
        }
        Ok(())
    }
}

fn ensure_finite(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("{field} must be a finite number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_requires_status() {
        let req = ResolveAlertRequest::default();
        let err = req.validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg.contains("status is required")));
    }

    #[test]
    fn resolve_rejects_open_status() {
        let req = ResolveAlertRequest {
            status: Some(AlertStatus::Open),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn resolve_selection_needs_resolved_status() {
        let req = ResolveAlertRequest {
            status: Some(AlertStatus::Ignored),
            selected_price_list_item_id: Some("pli-1".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = ResolveAlertRequest {
            status: Some(AlertStatus::Resolved),
            selected_price_list_item_id: Some("pli-1".into()),
            apply_approved_price: true,
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap(), AlertStatus::Resolved);
    }

    #[test]
    fn resolve_apply_price_needs_selection() {
        let req = ResolveAlertRequest {
            status: Some(AlertStatus::Resolved),
            apply_approved_price: true,
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn resolve_request_from_json_without_status() {
        let req: ResolveAlertRequest =
            serde_json::from_str(r#"{"resolution_note":"checked"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn merge_needs_two_distinct_ids() {
        let one = MergeRequest {
            estimate_ids: vec!["est-1".into()],
            ..Default::default()
        };
        assert!(one.validate().is_err());

        let dup = MergeRequest {
            estimate_ids: vec!["est-1".into(), "est-1".into()],
            ..Default::default()
        };
        assert!(dup.validate().is_err());

        let ok = MergeRequest {
            estimate_ids: vec!["est-1".into(), "est-2".into()],
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn offer_import_defaults() {
        let bundle: OfferImport = serde_json::from_str(
            r#"{"company":"ACME","round":1,"items":[{"quantity":1,"unit_price":2}]}"#,
        )
        .unwrap();
        assert!(bundle.validate().is_ok());
        assert_eq!(bundle.items[0].origin, OfferItemOrigin::Baseline);
        assert_eq!(bundle.items[0].source, OfferItemSource::Detailed);
    }

    #[test]
    fn estimate_import_flattens_wbs_levels() {
        let bundle: EstimateImport = serde_json::from_str(
            r#"{"name":"Computo","items":[{"quantity":1,"unit_price":2,"level_1":"1","level_3":"1.1.1"}]}"#,
        )
        .unwrap();
        assert!(bundle.validate().is_ok());
        assert_eq!(bundle.items[0].wbs.get(1), Some("1"));
        assert_eq!(bundle.items[0].wbs.get(3), Some("1.1.1"));
    }

    #[test]
    fn offer_import_rejects_round_zero() {
        let bundle = OfferImport {
            company: "ACME".into(),
            round: 0,
            items: Vec::new(),
        };
        assert!(bundle.validate().is_err());
    }
}
