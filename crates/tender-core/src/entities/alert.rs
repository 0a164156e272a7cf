use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{AlertSeverity, AlertStatus, AlertType};

/// A discrepancy raised by a reconciliation pass.
///
/// Offer-side alerts reference `offer_item_id`; `missing_baseline` alerts have
/// no offer item and reference the uncovered baseline line through
/// `estimate_item_id` instead.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OfferAlert {
    pub id: String,
    pub project_id: String,
    pub offer_id: String,
    pub offer_item_id: Option<String>,
    pub estimate_item_id: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    pub actual: Option<f64>,
    pub expected: Option<f64>,
    pub delta: Option<f64>,
    pub resolution_note: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
