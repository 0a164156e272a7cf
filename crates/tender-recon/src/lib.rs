//! # tender-recon
//!
//! Reconciliation of submitted offer lines against a baseline estimate.
//!
//! Everything here is pure and synchronous; persistence of the results lives
//! in `tender-db`.
//! - [`catalog`] indexes the baseline price list by id, code, and description token.
//! - [`matcher`] resolves one offer line against the catalog.
//! - [`detect`] turns matched pairs and uncovered baseline lines into alert drafts.
//! - [`pass`] runs a whole offer through matching and detection for a WBS scope.

pub mod catalog;
pub mod detect;
pub mod matcher;
pub mod pass;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use catalog::{CatalogIndex, ScoredItem, description_tokens, token_overlap};
pub use detect::{AlertDraft, AlertKey, BaselineIndex, Tolerances, detect_alerts, price_severity};
pub use matcher::{MatchBasis, MatchResult, MatchSettings, MatchStatus, match_offer_item};
pub use pass::{ItemLink, PassOutcome, reconcile_items};

/// Thresholds for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconSettings {
    pub matching: MatchSettings,
    pub tolerances: Tolerances,
}
