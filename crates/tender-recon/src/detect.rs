//! Discrepancy detection.
//!
//! Turns match results into alert drafts. A draft is what a pass would like
//! to see open; the store decides whether it creates, refreshes, or
//! suppresses an alert.

use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::entities::{EstimateItem, OfferItem, PriceListItem};
use tender_core::enums::{AlertSeverity, AlertType};

use crate::matcher::{MatchBasis, MatchResult, MatchStatus};

/// Numeric tolerances of the detection rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Tolerances {
    /// Absolute unit-price difference tolerated.
    pub price: f64,
    /// Absolute quantity difference tolerated.
    pub quantity: f64,
    /// Relative price difference above which a mismatch is an error.
    pub price_error_ratio: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            price: 0.01,
            quantity: 0.001,
            price_error_ratio: 0.25,
        }
    }
}

/// Identity of an alert across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey {
    pub offer_item_id: Option<String>,
    pub estimate_item_id: Option<String>,
    pub alert_type: AlertType,
}

/// An alert a pass wants open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlertDraft {
    pub offer_item_id: Option<String>,
    pub estimate_item_id: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub actual: Option<f64>,
    pub expected: Option<f64>,
    pub delta: Option<f64>,
}

impl AlertDraft {
    #[must_use]
    pub fn key(&self) -> AlertKey {
        AlertKey {
            offer_item_id: self.offer_item_id.clone(),
            estimate_item_id: self.estimate_item_id.clone(),
            alert_type: self.alert_type,
        }
    }
}

/// Severity of a price mismatch.
///
/// `error` when the relative difference exceeds `ratio` (always for a zero
/// expected price), `warning` otherwise.
#[must_use]
pub fn price_severity(expected: f64, delta: f64, ratio: f64) -> AlertSeverity {
    if expected.abs() < f64::EPSILON || (delta / expected).abs() > ratio {
        AlertSeverity::Error
    } else {
        AlertSeverity::Warning
    }
}

/// Lookups over the baseline lines of one estimate.
#[derive(Debug)]
pub struct BaselineIndex<'a> {
    by_id: HashMap<&'a str, &'a EstimateItem>,
    quantity_by_price_list_item: HashMap<&'a str, f64>,
}

impl<'a> BaselineIndex<'a> {
    #[must_use]
    pub fn build(items: &'a [EstimateItem]) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut quantity_by_price_list_item: HashMap<&str, f64> = HashMap::new();
        for item in items {
            by_id.insert(item.id.as_str(), item);
            if let Some(pli) = item.price_list_item_id.as_deref() {
                *quantity_by_price_list_item.entry(pli).or_default() += item.quantity;
            }
        }
        Self {
            by_id,
            quantity_by_price_list_item,
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a EstimateItem> {
        self.by_id.get(id).copied()
    }

    /// Summed baseline quantity priced by a catalog entry.
    #[must_use]
    pub fn quantity_for(&self, price_list_item_id: &str) -> Option<f64> {
        self.quantity_by_price_list_item.get(price_list_item_id).copied()
    }
}

/// Alert drafts for one evaluated set.
///
/// `pairs` are the offer lines under evaluation with their match results.
/// Catalog-matched lines sharing a price-list item are checked for quantity
/// as one group: their summed quantity against the summed baseline quantity,
/// reported on the first line of the group.
/// `covered_items` and `covered_price_list_items` record which baseline
/// lines the whole offer answers; every `scope` line covered by neither is
/// reported as `missing_baseline`.
#[must_use]
pub fn detect_alerts(
    pairs: &[(&OfferItem, &MatchResult)],
    baseline: &BaselineIndex<'_>,
    scope: &[&EstimateItem],
    covered_items: &HashSet<&str>,
    covered_price_list_items: &HashSet<&str>,
    tolerances: &Tolerances,
) -> Vec<AlertDraft> {
    let offered = offered_quantities(pairs);
    let mut drafts = Vec::new();
    for (item, result) in pairs {
        match result.status {
            MatchStatus::Matched => {
                detect_matched(item, result, baseline, &offered, tolerances, &mut drafts);
            }
            MatchStatus::Ambiguous => drafts.push(ambiguous_draft(item, result)),
            MatchStatus::Unmatched => drafts.push(addendum_draft(item, None)),
        }
    }

    for line in scope {
        let covered = covered_items.contains(line.id.as_str())
            || line
                .price_list_item_id
                .as_deref()
                .is_some_and(|pli| covered_price_list_items.contains(pli));
        if !covered {
            drafts.push(AlertDraft {
                offer_item_id: None,
                estimate_item_id: Some(line.id.clone()),
                alert_type: AlertType::MissingBaseline,
                severity: AlertSeverity::Warning,
                message: format!("baseline line {} has no offer line", line_label(line)),
                actual: None,
                expected: Some(line.amount),
                delta: None,
            });
        }
    }
    drafts
}

/// Offer-side quantity of the catalog-matched lines of one price-list item.
#[derive(Debug)]
struct OfferedQuantity<'a> {
    first_item_id: &'a str,
    total: f64,
    lines: usize,
}

fn offered_quantities<'a>(
    pairs: &[(&'a OfferItem, &'a MatchResult)],
) -> HashMap<&'a str, OfferedQuantity<'a>> {
    let mut offered: HashMap<&str, OfferedQuantity<'_>> = HashMap::new();
    for &(item, result) in pairs {
        if result.status != MatchStatus::Matched || result.basis == Some(MatchBasis::StructuralLink)
        {
            continue;
        }
        let Some(pli) = result.price_list_item() else {
            continue;
        };
        let entry = offered.entry(pli.id.as_str()).or_insert(OfferedQuantity {
            first_item_id: item.id.as_str(),
            total: 0.0,
            lines: 0,
        });
        entry.total += item.quantity;
        entry.lines += 1;
    }
    offered
}

fn detect_matched(
    item: &OfferItem,
    result: &MatchResult,
    baseline: &BaselineIndex<'_>,
    offered: &HashMap<&str, OfferedQuantity<'_>>,
    tolerances: &Tolerances,
    drafts: &mut Vec<AlertDraft>,
) {
    if result.basis == Some(MatchBasis::StructuralLink) {
        let Some(line) = item.estimate_item_id.as_deref().and_then(|id| baseline.get(id)) else {
            drafts.push(addendum_draft(
                item,
                Some("linked baseline line is not part of the estimate"),
            ));
            return;
        };
        let reference = Reference {
            estimate_item_id: Some(line.id.as_str()),
            code: line.code.as_deref(),
            price: line.unit_price,
            quantity: Some(QuantityCheck {
                actual: item.quantity,
                expected: line.quantity,
                lines: 1,
            }),
        };
        compare(item, &reference, tolerances, true, drafts);
        return;
    }

    let Some(pli) = result.price_list_item() else {
        return;
    };
    let group = offered
        .get(pli.id.as_str())
        .filter(|group| group.first_item_id == item.id);
    let reference = Reference::catalog(pli, baseline, group);
    let check_code = result.basis == Some(MatchBasis::Description);
    compare(item, &reference, tolerances, check_code, drafts);
}

/// Expected values an offer line is compared with.
struct Reference<'a> {
    estimate_item_id: Option<&'a str>,
    code: Option<&'a str>,
    price: f64,
    quantity: Option<QuantityCheck>,
}

#[derive(Clone, Copy)]
struct QuantityCheck {
    actual: f64,
    expected: f64,
    lines: usize,
}

impl<'a> Reference<'a> {
    /// `group` is set only on the line that reports the quantity check of
    /// its price-list item.
    fn catalog(
        pli: &'a PriceListItem,
        baseline: &BaselineIndex<'_>,
        group: Option<&OfferedQuantity<'_>>,
    ) -> Self {
        let quantity = group.zip(baseline.quantity_for(&pli.id)).map(|(group, expected)| {
            QuantityCheck {
                actual: group.total,
                expected,
                lines: group.lines,
            }
        });
        Self {
            estimate_item_id: None,
            code: Some(pli.code.as_str()),
            price: pli.price,
            quantity,
        }
    }
}

fn compare(
    item: &OfferItem,
    reference: &Reference<'_>,
    tolerances: &Tolerances,
    check_code: bool,
    drafts: &mut Vec<AlertDraft>,
) {
    let label = item_label(item);
    let estimate_item_id = reference.estimate_item_id.map(String::from);

    let price_delta = item.unit_price - reference.price;
    if price_delta.abs() > tolerances.price {
        drafts.push(AlertDraft {
            offer_item_id: Some(item.id.clone()),
            estimate_item_id: estimate_item_id.clone(),
            alert_type: AlertType::PriceMismatch,
            severity: price_severity(reference.price, price_delta, tolerances.price_error_ratio),
            message: format!(
                "{label}: unit price {:.2} differs from baseline {:.2}",
                item.unit_price, reference.price
            ),
            actual: Some(item.unit_price),
            expected: Some(reference.price),
            delta: Some(price_delta),
        });
    }

    if let Some(check) = &reference.quantity {
        let QuantityCheck {
            actual,
            expected,
            lines,
        } = *check;
        let quantity_delta = actual - expected;
        if quantity_delta.abs() > tolerances.quantity {
            let across = if lines > 1 {
                format!(" across {lines} lines")
            } else {
                String::new()
            };
            drafts.push(AlertDraft {
                offer_item_id: Some(item.id.clone()),
                estimate_item_id: estimate_item_id.clone(),
                alert_type: AlertType::QuantityMismatch,
                severity: AlertSeverity::Warning,
                message: format!(
                    "{label}: quantity {actual}{across} differs from baseline {expected}"
                ),
                actual: Some(actual),
                expected: Some(expected),
                delta: Some(quantity_delta),
            });
        }
    }

    if check_code {
        if let (Some(offered), Some(expected)) = (item.code.as_deref(), reference.code) {
            if offered != expected {
                drafts.push(AlertDraft {
                    offer_item_id: Some(item.id.clone()),
                    estimate_item_id,
                    alert_type: AlertType::CodeMismatch,
                    severity: AlertSeverity::Info,
                    message: format!("{label}: code {offered} differs from baseline {expected}"),
                    actual: None,
                    expected: None,
                    delta: None,
                });
            }
        }
    }
}

fn ambiguous_draft(item: &OfferItem, result: &MatchResult) -> AlertDraft {
    let codes: Vec<&str> = result.candidates.iter().map(|c| c.code.as_str()).collect();
    AlertDraft {
        offer_item_id: Some(item.id.clone()),
        estimate_item_id: None,
        alert_type: AlertType::AmbiguousMatch,
        severity: AlertSeverity::Warning,
        message: format!(
            "{}: {} plausible price list items ({})",
            item_label(item),
            codes.len(),
            codes.join(", ")
        ),
        actual: None,
        expected: None,
        delta: None,
    }
}

fn addendum_draft(item: &OfferItem, reason: Option<&str>) -> AlertDraft {
    AlertDraft {
        offer_item_id: Some(item.id.clone()),
        estimate_item_id: None,
        alert_type: AlertType::Addendum,
        severity: AlertSeverity::Info,
        message: format!(
            "{}: {}",
            item_label(item),
            reason.unwrap_or("not in the baseline price list")
        ),
        actual: Some(item.effective_amount()),
        expected: None,
        delta: None,
    }
}

fn item_label(item: &OfferItem) -> String {
    item.code
        .as_deref()
        .or(item.description.as_deref())
        .map_or_else(|| format!("offer line {}", item.id), |s| format!("offer line {s}"))
}

fn line_label(line: &EstimateItem) -> String {
    match (line.progressive, line.code.as_deref()) {
        (Some(p), Some(code)) => format!("#{p} {code}"),
        (Some(p), None) => format!("#{p}"),
        (None, Some(code)) => code.to_string(),
        (None, None) => line.id.clone(),
    }
}
