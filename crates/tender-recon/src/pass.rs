//! One reconciliation pass over an offer.
//!
//! Matches every offer line, narrows the evaluation to a WBS scope, and
//! collects the alert drafts and link updates the store has to apply.

use std::collections::{BTreeSet, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::entities::{EstimateItem, OfferItem};
use tender_core::enums::ResolutionStatus;
use tender_wbs::filter_by_node_id;

use crate::ReconSettings;
use crate::catalog::CatalogIndex;
use crate::detect::{AlertDraft, BaselineIndex, detect_alerts};
use crate::matcher::{MatchBasis, MatchResult, MatchStatus, match_offer_item};

/// Price-list linkage an offer line should carry after the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ItemLink {
    pub offer_item_id: String,
    pub price_list_item_id: Option<String>,
    pub candidate_price_list_item_ids: Vec<String>,
    pub resolution_status: ResolutionStatus,
}

/// Everything a pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassOutcome {
    pub drafts: Vec<AlertDraft>,
    /// Only lines whose linkage changes.
    pub links: Vec<ItemLink>,
    /// Offer lines whose alerts this pass owns.
    pub evaluated_offer_items: BTreeSet<String>,
    /// Baseline lines whose `missing_baseline` alerts this pass owns.
    pub evaluated_estimate_items: BTreeSet<String>,
    pub matched: u32,
    pub ambiguous: u32,
    pub unmatched: u32,
}

/// Run matching and detection for the lines of one offer.
///
/// With `scope` set to a WBS node path, only baseline lines under that node
/// are checked for coverage, and only offer lines answering one of them
/// (structurally or through their price-list item) are evaluated. Ambiguous
/// and unmatched lines belong to no scope and are evaluated by unscoped
/// passes only.
#[must_use]
pub fn reconcile_items(
    offer_items: &[OfferItem],
    catalog: &CatalogIndex,
    baseline: &[EstimateItem],
    scope: Option<&str>,
    settings: &ReconSettings,
) -> PassOutcome {
    let results: Vec<MatchResult> = offer_items
        .iter()
        .map(|item| match_offer_item(item, catalog, &settings.matching))
        .collect();

    let scope_lines = filter_by_node_id(baseline, scope);
    let scope_ids: HashSet<&str> = scope_lines.iter().map(|l| l.id.as_str()).collect();
    let scope_plis: HashSet<&str> = scope_lines
        .iter()
        .filter_map(|l| l.price_list_item_id.as_deref())
        .collect();

    let mut covered_items: HashSet<&str> = HashSet::new();
    let mut covered_plis: HashSet<&str> = HashSet::new();
    for (item, result) in offer_items.iter().zip(&results) {
        if result.basis == Some(MatchBasis::StructuralLink) {
            if let Some(id) = item.estimate_item_id.as_deref() {
                covered_items.insert(id);
            }
        }
        if let Some(pli) = result.price_list_item() {
            covered_plis.insert(pli.id.as_str());
        }
    }

    let mut outcome = PassOutcome::default();
    let mut pairs: Vec<(&OfferItem, &MatchResult)> = Vec::new();
    for (item, result) in offer_items.iter().zip(&results) {
        let in_scope = scope.is_none()
            || match result.basis {
                Some(MatchBasis::StructuralLink) => item
                    .estimate_item_id
                    .as_deref()
                    .is_some_and(|id| scope_ids.contains(id)),
                _ => result
                    .price_list_item()
                    .is_some_and(|pli| scope_plis.contains(pli.id.as_str())),
            };
        if !in_scope {
            continue;
        }

        match result.status {
            MatchStatus::Matched => outcome.matched += 1,
            MatchStatus::Ambiguous => outcome.ambiguous += 1,
            MatchStatus::Unmatched => outcome.unmatched += 1,
        }
        if let Some(link) = link_update(item, result) {
            outcome.links.push(link);
        }
        outcome.evaluated_offer_items.insert(item.id.clone());
        pairs.push((item, result));
    }
    outcome.evaluated_estimate_items = scope_ids.iter().map(|id| (*id).to_string()).collect();

    let index = BaselineIndex::build(baseline);
    outcome.drafts = detect_alerts(
        &pairs,
        &index,
        &scope_lines,
        &covered_items,
        &covered_plis,
        &settings.tolerances,
    );

    tracing::debug!(
        scope = scope.unwrap_or("*"),
        evaluated = pairs.len(),
        matched = outcome.matched,
        ambiguous = outcome.ambiguous,
        unmatched = outcome.unmatched,
        drafts = outcome.drafts.len(),
        "reconciliation pass computed"
    );
    outcome
}

/// Linkage implied by a match, when it differs from what the line carries.
///
/// Structurally linked lines keep their import-time linkage.
fn link_update(item: &OfferItem, result: &MatchResult) -> Option<ItemLink> {
    if result.basis == Some(MatchBasis::StructuralLink) {
        return None;
    }
    let (price_list_item_id, candidates, status) = match result.status {
        MatchStatus::Matched => (
            result.price_list_item().map(|p| p.id.clone()),
            Vec::new(),
            ResolutionStatus::Resolved,
        ),
        MatchStatus::Ambiguous => (None, result.candidate_ids(), ResolutionStatus::Pending),
        MatchStatus::Unmatched => (None, Vec::new(), ResolutionStatus::Pending),
    };
    let unchanged = item.price_list_item_id == price_list_item_id
        && item.candidate_price_list_item_ids == candidates
        && item.resolution_status == status;
    (!unchanged).then(|| ItemLink {
        offer_item_id: item.id.clone(),
        price_list_item_id,
        candidate_price_list_item_ids: candidates,
        resolution_status: status,
    })
}
