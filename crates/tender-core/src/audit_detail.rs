//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! fix the shape of the most common ones.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Detail for `AuditAction::StatusChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusChangedDetail {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

/// Detail for `AuditAction::Mapped` on an offer item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MappedDetail {
    pub price_list_item_id: String,
    pub applied_price: bool,
    pub cascaded_alerts: Vec<String>,
}

/// Detail for `AuditAction::Reconciled` on an offer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReconciledDetail {
    pub scope: Option<String>,
    pub matched: u32,
    pub ambiguous: u32,
    pub unmatched: u32,
    pub alerts_created: u32,
    pub alerts_refreshed: u32,
    pub alerts_suppressed: u32,
    pub alerts_cleared: u32,
}

/// Detail for `AuditAction::Merged` on the new estimate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MergedDetail {
    pub sources: Vec<String>,
    pub price_list_items: u32,
    pub duplicates_dropped: u32,
    pub estimate_items: u32,
    pub wbs_nodes: u32,
}
