use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{OfferItemOrigin, OfferItemSource, ResolutionStatus};

/// A company's priced response to a baseline estimate, one per company + round.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Offer {
    pub id: String,
    pub project_id: String,
    pub estimate_id: String,
    pub company: String,
    pub round: u32,
    pub created_at: DateTime<Utc>,
}

/// A single submitted offer line.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OfferItem {
    pub id: String,
    pub offer_id: String,
    pub project_id: String,
    pub origin: OfferItemOrigin,
    pub source: OfferItemSource,
    pub resolution_status: ResolutionStatus,
    pub candidate_price_list_item_ids: Vec<String>,
    pub price_list_item_id: Option<String>,
    pub estimate_item_id: Option<String>,
    pub progressive: Option<i64>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OfferItem {
    /// Whether the line carries the structural link established at import.
    ///
    /// Only detailed baseline lines keep `estimate_item_id`; the matcher
    /// trusts it without consulting the catalog.
    #[must_use]
    pub const fn has_structural_link(&self) -> bool {
        matches!(self.source, OfferItemSource::Detailed)
            && matches!(self.origin, OfferItemOrigin::Baseline)
            && self.estimate_item_id.is_some()
    }

    /// Enforce the linkage invariant.
    ///
    /// Addendum and aggregated lines never keep `estimate_item_id` or
    /// `progressive`. Returns `true` when a field was cleared.
    pub fn normalize_linkage(&mut self) -> bool {
        let forced = matches!(self.origin, OfferItemOrigin::Addendum)
            || matches!(self.source, OfferItemSource::Aggregated);
        if forced && (self.estimate_item_id.is_some() || self.progressive.is_some()) {
            self.estimate_item_id = None;
            self.progressive = None;
            return true;
        }
        false
    }

    /// Resolution status implied by the price-list link.
    #[must_use]
    pub const fn default_resolution(price_list_item_id: Option<&String>) -> ResolutionStatus {
        if price_list_item_id.is_some() {
            ResolutionStatus::Resolved
        } else {
            ResolutionStatus::Pending
        }
    }

    /// Amount as submitted, or `quantity * unit_price` when the import left it out.
    #[must_use]
    pub fn effective_amount(&self) -> f64 {
        self.amount.unwrap_or(self.quantity * self.unit_price)
    }
}
