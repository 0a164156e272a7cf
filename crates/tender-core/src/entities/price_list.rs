use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A baseline catalog entry.
///
/// Owned by a project + estimate pair. Never mutated in place once offers
/// reference it; catalog updates go through re-import.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PriceListItem {
    pub id: String,
    pub project_id: String,
    pub estimate_id: String,
    pub code: String,
    pub description: String,
    pub unit: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}
