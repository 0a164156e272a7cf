//! Status enums, entity types, and actions for the reconciliation engine.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `AlertStatus` provides `allowed_next_states()` to enforce the alert
//! lifecycle at the application layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// OfferItemOrigin
// ---------------------------------------------------------------------------

/// Whether an offer line answers a baseline line or adds something new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OfferItemOrigin {
    Baseline,
    Addendum,
}

impl OfferItemOrigin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Addendum => "addendum",
        }
    }
}

impl fmt::Display for OfferItemOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OfferItemSource
// ---------------------------------------------------------------------------

/// How the offer line was submitted.
///
/// `Detailed` lines mirror baseline lines one by one (linked by
/// `estimate_item_id` + `progressive`). `Aggregated` lines are priced per
/// price-list item (linked by `price_list_item_id` + `code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OfferItemSource {
    Detailed,
    Aggregated,
}

impl OfferItemSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Aggregated => "aggregated",
        }
    }
}

impl fmt::Display for OfferItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResolutionStatus
// ---------------------------------------------------------------------------

/// Whether an offer line is linked to a baseline price-list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    Pending,
}

impl ResolutionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertType
// ---------------------------------------------------------------------------

/// Kind of discrepancy raised by a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceMismatch,
    QuantityMismatch,
    CodeMismatch,
    MissingBaseline,
    AmbiguousMatch,
    Addendum,
}

impl AlertType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceMismatch => "price_mismatch",
            Self::QuantityMismatch => "quantity_mismatch",
            Self::CodeMismatch => "code_mismatch",
            Self::MissingBaseline => "missing_baseline",
            Self::AmbiguousMatch => "ambiguous_match",
            Self::Addendum => "addendum",
        }
    }

    /// Alert types whose resolution may carry a selected price-list item.
    #[must_use]
    pub const fn accepts_mapping(self) -> bool {
        matches!(self, Self::AmbiguousMatch | Self::Addendum)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertSeverity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

impl AlertSeverity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertStatus
// ---------------------------------------------------------------------------

/// Status of an offer alert.
///
/// ```text
/// open → resolved
///      → ignored
/// ```
///
/// `resolved` and `ignored` are terminal. A later reconciliation pass never
/// reopens them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Resolved,
    Ignored,
}

impl AlertStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::Resolved, Self::Ignored],
            Self::Resolved | Self::Ignored => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Ignored)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Action recorded in an audit trail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Imported,
    Reconciled,
    Mapped,
    Merged,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "status_changed",
            Self::Imported => "imported",
            Self::Reconciled => "reconciled",
            Self::Mapped => "mapped",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Every persisted entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Estimate,
    PriceListItem,
    EstimateItem,
    WbsNode,
    Offer,
    OfferItem,
    Alert,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Estimate => "estimate",
            Self::PriceListItem => "price_list_item",
            Self::EstimateItem => "estimate_item",
            Self::WbsNode => "wbs_node",
            Self::Offer => "offer",
            Self::OfferItem => "offer_item",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
