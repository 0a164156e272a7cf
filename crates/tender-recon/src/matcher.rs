//! Offer line matching against the price catalog.
//!
//! Resolution order: structural link, explicit price-list id, exact code,
//! description similarity. The first rule that yields candidates decides.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::entities::{OfferItem, PriceListItem};

use crate::catalog::{CatalogIndex, ScoredItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Ambiguous,
    Unmatched,
}

/// Rule that produced a match or a candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    StructuralLink,
    ExplicitId,
    Code,
    Description,
}

/// Matching thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MatchSettings {
    /// Description candidates scoring below this are discarded.
    pub min_similarity: f64,
    /// Best score needed to accept one of several candidates.
    pub high_confidence: f64,
    /// Lead over the runner-up needed to accept one of several candidates.
    pub ambiguity_margin: f64,
    /// Cap on exposed candidates of an ambiguous line.
    pub max_candidates: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            min_similarity: 0.35,
            high_confidence: 0.8,
            ambiguity_margin: 0.15,
            max_candidates: 5,
        }
    }
}

/// Outcome of matching one offer line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchResult {
    pub status: MatchStatus,
    pub basis: Option<MatchBasis>,
    /// The match itself when `matched` (empty for a structural link the
    /// catalog does not know), the ranked candidates when `ambiguous`.
    pub candidates: Vec<PriceListItem>,
}

impl MatchResult {
    fn matched(basis: MatchBasis, item: Option<&PriceListItem>) -> Self {
        Self {
            status: MatchStatus::Matched,
            basis: Some(basis),
            candidates: item.into_iter().cloned().collect(),
        }
    }

    fn unmatched() -> Self {
        Self {
            status: MatchStatus::Unmatched,
            basis: None,
            candidates: Vec::new(),
        }
    }

    /// The matched catalog entry, if any.
    #[must_use]
    pub fn price_list_item(&self) -> Option<&PriceListItem> {
        match self.status {
            MatchStatus::Matched => self.candidates.first(),
            MatchStatus::Ambiguous | MatchStatus::Unmatched => None,
        }
    }

    #[must_use]
    pub fn candidate_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.id.clone()).collect()
    }
}

/// Match one offer line against the catalog.
#[must_use]
pub fn match_offer_item(
    item: &OfferItem,
    catalog: &CatalogIndex,
    settings: &MatchSettings,
) -> MatchResult {
    if item.has_structural_link() {
        let linked = item
            .price_list_item_id
            .as_deref()
            .and_then(|id| catalog.get(id));
        return MatchResult::matched(MatchBasis::StructuralLink, linked);
    }

    if let Some(id) = item.price_list_item_id.as_deref() {
        if let Some(found) = catalog.get(id) {
            return MatchResult::matched(MatchBasis::ExplicitId, Some(found));
        }
        tracing::debug!(offer_item = %item.id, price_list_item = id, "explicit link not in catalog");
    }

    let description = item.description.as_deref().unwrap_or_default();

    if let Some(code) = item.code.as_deref().filter(|c| !c.is_empty()) {
        let hits = catalog.by_code(code);
        match hits.len() {
            0 => {}
            1 => return MatchResult::matched(MatchBasis::Code, hits.first().copied()),
            _ => {
                let ranked = catalog.rank(&hits, description);
                return decide(&ranked, MatchBasis::Code, settings);
            }
        }
    }

    if description.trim().is_empty() {
        return MatchResult::unmatched();
    }
    let ranked = catalog.similar(description, settings.min_similarity);
    decide(&ranked, MatchBasis::Description, settings)
}

fn decide(ranked: &[ScoredItem<'_>], basis: MatchBasis, settings: &MatchSettings) -> MatchResult {
    match ranked {
        [] => MatchResult::unmatched(),
        [only] => MatchResult::matched(basis, Some(only.item)),
        [best, runner_up, ..]
            if best.score >= settings.high_confidence
                && best.score - runner_up.score >= settings.ambiguity_margin =>
        {
            MatchResult::matched(basis, Some(best.item))
        }
        _ => MatchResult {
            status: MatchStatus::Ambiguous,
            basis: Some(basis),
            candidates: ranked
                .iter()
                .take(settings.max_candidates)
                .map(|s| s.item.clone())
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::pli;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tender_core::enums::{OfferItemOrigin, OfferItemSource, ResolutionStatus};

    fn catalog() -> CatalogIndex {
        CatalogIndex::build(vec![
            pli("pli-1", "A1", "Concrete slab C25/30", 100.0),
            pli("pli-2", "A2", "Concrete wall C25/30", 120.0),
            pli("pli-3", "B1", "Steel rebar B450C", 1.2),
            pli("pli-4", "A1", "Concrete slab lightweight", 90.0),
            pli("pli-5", "C1", "Excavation trench", 15.0),
            pli("pli-6", "C2", "Excavation trench rock", 25.0),
        ])
    }

    fn offer_item(code: Option<&str>, description: Option<&str>) -> OfferItem {
        let now = Utc::now();
        OfferItem {
            id: "oit-1".into(),
            offer_id: "off-1".into(),
            project_id: "prj-1".into(),
            origin: OfferItemOrigin::Baseline,
            source: OfferItemSource::Aggregated,
            resolution_status: ResolutionStatus::Pending,
            candidate_price_list_item_ids: Vec::new(),
            price_list_item_id: None,
            estimate_item_id: None,
            progressive: None,
            code: code.map(String::from),
            description: description.map(String::from),
            unit: None,
            quantity: 1.0,
            unit_price: 1.0,
            amount: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ids(result: &MatchResult) -> Vec<String> {
        result.candidate_ids()
    }

    #[test]
    fn structural_link_matches_without_lookup() {
        let mut item = offer_item(Some("ZZZ"), Some("nothing like the catalog"));
        item.source = OfferItemSource::Detailed;
        item.estimate_item_id = Some("eit-1".into());
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.basis, Some(MatchBasis::StructuralLink));
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn explicit_id_wins_over_code() {
        let mut item = offer_item(Some("A2"), None);
        item.price_list_item_id = Some("pli-3".into());
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.basis, Some(MatchBasis::ExplicitId));
        assert_eq!(result.price_list_item().map(|p| p.id.as_str()), Some("pli-3"));
    }

    #[test]
    fn unknown_explicit_id_falls_back_to_code() {
        let mut item = offer_item(Some("A2"), None);
        item.price_list_item_id = Some("pli-404".into());
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.basis, Some(MatchBasis::Code));
        assert_eq!(ids(&result), vec!["pli-2"]);
    }

    #[test]
    fn single_code_hit_matches() {
        let result = match_offer_item(&offer_item(Some("B1"), None), &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.basis, Some(MatchBasis::Code));
    }

    #[test]
    fn duplicate_code_resolved_by_confident_description() {
        let item = offer_item(Some("A1"), Some("concrete slab lightweight"));
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(ids(&result), vec!["pli-4"]);
    }

    #[test]
    fn duplicate_code_without_description_is_ambiguous() {
        let item = offer_item(Some("A1"), None);
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Ambiguous);
        assert_eq!(result.basis, Some(MatchBasis::Code));
        assert_eq!(ids(&result), vec!["pli-1", "pli-4"]);
        assert!(result.price_list_item().is_none());
    }

    #[test]
    fn description_fallback_single_candidate() {
        let item = offer_item(Some("X9"), Some("steel rebar"));
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.basis, Some(MatchBasis::Description));
        assert_eq!(ids(&result), vec!["pli-3"]);
    }

    #[test]
    fn close_description_candidates_are_ambiguous() {
        let item = offer_item(None, Some("excavation trench deep"));
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Ambiguous);
        assert_eq!(ids(&result), vec!["pli-5", "pli-6"]);
    }

    #[test]
    fn candidate_list_is_capped() {
        let settings = MatchSettings {
            max_candidates: 1,
            ..MatchSettings::default()
        };
        let item = offer_item(None, Some("excavation trench deep"));
        let result = match_offer_item(&item, &catalog(), &settings);
        assert_eq!(result.status, MatchStatus::Ambiguous);
        assert_eq!(ids(&result), vec!["pli-5"]);
    }

    #[test]
    fn nothing_similar_is_unmatched() {
        let item = offer_item(Some("X9"), Some("roof tiles"));
        let result = match_offer_item(&item, &catalog(), &MatchSettings::default());
        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.basis, None);
        assert!(result.candidates.is_empty());

        let bare = offer_item(None, None);
        assert_eq!(
            match_offer_item(&bare, &catalog(), &MatchSettings::default()).status,
            MatchStatus::Unmatched
        );
    }

    #[test]
    fn result_wire_names_are_snake_case() {
        let item = offer_item(Some("A1"), None);
        let ambiguous = serde_json::to_value(match_offer_item(&item, &catalog(), &MatchSettings::default()))
            .unwrap();
        assert_eq!(ambiguous["status"], "ambiguous");
        assert_eq!(ambiguous["basis"], "code");
        assert_eq!(ambiguous["candidates"].as_array().map(Vec::len), Some(2));

        let mut linked = offer_item(None, None);
        linked.source = OfferItemSource::Detailed;
        linked.estimate_item_id = Some("eit-1".into());
        let structural = serde_json::to_value(match_offer_item(&linked, &catalog(), &MatchSettings::default()))
            .unwrap();
        assert_eq!(
            structural,
            serde_json::json!({"status": "matched", "basis": "structural_link", "candidates": []})
        );
    }
}
