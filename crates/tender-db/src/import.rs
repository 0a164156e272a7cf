//! Storage of already-parsed estimate and offer bundles.
//!
//! Spreadsheet parsing happens upstream; these operations resolve the
//! references a bundle carries (catalog codes, baseline progressives,
//! explicit price-list ids) and write everything in one transaction.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::entities::{Estimate, Offer, OfferItem};
use tender_core::enums::{AuditAction, EntityType, OfferItemOrigin, OfferItemSource};
use tender_core::ids::PREFIX_OFFER_ITEM;
use tender_core::requests::{EstimateImport, OfferImport};

use crate::error::DatabaseError;
use crate::helpers::generate_id;
use crate::repos::audit::append_audit;
use crate::repos::estimate::{clear_baseline, insert_estimate, require_estimate};
use crate::repos::estimate_item::{fetch_estimate_items, insert_estimate_item};
use crate::repos::offer::{find_offer, insert_offer};
use crate::repos::offer_item::insert_offer_item;
use crate::repos::price_list::{fetch_price_list, insert_price_list_item};
use crate::repos::project::fetch_project;
use crate::repos::wbs_node::rebuild_wbs_nodes;
use crate::service::TenderService;

/// Result of an estimate import.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EstimateImportReport {
    pub estimate: Estimate,
    pub price_list_items: u32,
    pub estimate_items: u32,
    pub wbs_nodes: u32,
}

/// Result of an offer import.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfferImportReport {
    pub offer: Offer,
    pub offer_items: u32,
    /// Detailed lines linked to a baseline line by progressive.
    pub structural_links: u32,
    /// Lines whose baseline linkage was dropped by the linkage rules.
    pub links_cleared: u32,
}

impl TenderService {
    /// Store an estimate bundle under a project.
    ///
    /// A baseline bundle takes the baseline flag from the project's other
    /// estimates. Lines reference catalog entries by code; the first entry
    /// with a code wins.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for a malformed bundle or an
    /// unknown `price_list_code`, `DatabaseError::NotFound` for an unknown project.
    pub async fn import_estimate(
        &self,
        project_id: &str,
        bundle: &EstimateImport,
    ) -> Result<EstimateImportReport, DatabaseError> {
        bundle.validate()?;
        let wtx = self.begin().await?;
        let result = store_estimate(&wtx.tx, project_id, bundle).await;
        let report = wtx.finish("import_estimate", result).await?;
        tracing::info!(
            estimate = %report.estimate.id,
            price_list_items = report.price_list_items,
            estimate_items = report.estimate_items,
            "estimate imported"
        );
        Ok(report)
    }

    /// Store an offer bundle against an estimate.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for a malformed bundle or an explicit
    /// price-list id outside the estimate's catalog, `DatabaseError::Conflict`
    /// when the company already submitted that round, and
    /// `DatabaseError::NotFound` for an unknown estimate.
    pub async fn import_offer(
        &self,
        estimate_id: &str,
        bundle: &OfferImport,
    ) -> Result<OfferImportReport, DatabaseError> {
        bundle.validate()?;
        let wtx = self.begin().await?;
        let result = store_offer(&wtx.tx, estimate_id, bundle).await;
        let report = wtx.finish("import_offer", result).await?;
        tracing::info!(
            offer = %report.offer.id,
            company = %report.offer.company,
            round = report.offer.round,
            offer_items = report.offer_items,
            "offer imported"
        );
        Ok(report)
    }
}

async fn store_estimate(
    conn: &libsql::Connection,
    project_id: &str,
    bundle: &EstimateImport,
) -> Result<EstimateImportReport, DatabaseError> {
    fetch_project(conn, project_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("project", project_id))?;

    if bundle.is_baseline {
        clear_baseline(conn, project_id).await?;
    }
    let estimate = insert_estimate(
        conn,
        project_id,
        &bundle.name,
        bundle.is_baseline,
        bundle.price_list_name.as_deref(),
    )
    .await?;

    let mut by_code: HashMap<&str, String> = HashMap::new();
    for entry in &bundle.price_list {
        let stored = insert_price_list_item(conn, project_id, &estimate.id, entry).await?;
        by_code.entry(entry.code.as_str()).or_insert(stored.id);
    }

    for (idx, line) in bundle.items.iter().enumerate() {
        let price_list_item_id = match line.price_list_code.as_deref().filter(|c| !c.is_empty()) {
            Some(code) => Some(by_code.get(code).map(String::as_str).ok_or_else(|| {
                DatabaseError::Validation(format!(
                    "items[{idx}]: price_list_code {code} is not in the price list"
                ))
            })?),
            None => None,
        };
        insert_estimate_item(conn, project_id, &estimate.id, price_list_item_id, line).await?;
    }

    let wbs_nodes = rebuild_wbs_nodes(conn, &estimate.id).await?;
    let report = EstimateImportReport {
        price_list_items: count(bundle.price_list.len()),
        estimate_items: count(bundle.items.len()),
        wbs_nodes,
        estimate,
    };
    append_audit(
        conn,
        EntityType::Estimate,
        &report.estimate.id,
        AuditAction::Imported,
        Some(serde_json::json!({
            "is_baseline": bundle.is_baseline,
            "price_list_items": report.price_list_items,
            "estimate_items": report.estimate_items,
            "wbs_nodes": report.wbs_nodes,
        })),
    )
    .await?;
    Ok(report)
}

async fn store_offer(
    conn: &libsql::Connection,
    estimate_id: &str,
    bundle: &OfferImport,
) -> Result<OfferImportReport, DatabaseError> {
    let estimate = require_estimate(conn, estimate_id).await?;
    if find_offer(conn, estimate_id, &bundle.company, bundle.round)
        .await?
        .is_some()
    {
        return Err(DatabaseError::Conflict(format!(
            "{} already submitted round {} for estimate {estimate_id}",
            bundle.company, bundle.round
        )));
    }

    let baseline = fetch_estimate_items(conn, estimate_id).await?;
    let mut by_progressive: HashMap<i64, &str> = HashMap::new();
    for line in &baseline {
        if let Some(progressive) = line.progressive {
            by_progressive.entry(progressive).or_insert(line.id.as_str());
        }
    }
    let catalog: HashSet<String> = fetch_price_list(conn, estimate_id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let offer = insert_offer(conn, &estimate.project_id, estimate_id, &bundle.company, bundle.round).await?;
    let mut report = OfferImportReport {
        offer,
        offer_items: 0,
        structural_links: 0,
        links_cleared: 0,
    };

    for (idx, line) in bundle.items.iter().enumerate() {
        if let Some(pli) = line.price_list_item_id.as_deref() {
            if !catalog.contains(pli) {
                return Err(DatabaseError::Validation(format!(
                    "items[{idx}]: price_list_item_id {pli} is not in the estimate's price list"
                )));
            }
        }

        let detailed_baseline = line.source == OfferItemSource::Detailed
            && line.origin == OfferItemOrigin::Baseline;
        let estimate_item_id = line.progressive.and_then(|p| {
            let found = by_progressive.get(&p).map(|id| (*id).to_string());
            if found.is_none() && detailed_baseline {
                tracing::debug!(line = idx, progressive = p, "no baseline line with this progressive");
            }
            found
        });

        let now = Utc::now();
        let mut item = OfferItem {
            id: generate_id(conn, PREFIX_OFFER_ITEM).await?,
            offer_id: report.offer.id.clone(),
            project_id: report.offer.project_id.clone(),
            origin: line.origin,
            source: line.source,
            resolution_status: OfferItem::default_resolution(line.price_list_item_id.as_ref()),
            candidate_price_list_item_ids: Vec::new(),
            price_list_item_id: line.price_list_item_id.clone(),
            estimate_item_id,
            progressive: line.progressive,
            code: line.code.clone(),
            description: line.description.clone(),
            unit: line.unit.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            amount: line.amount,
            created_at: now,
            updated_at: now,
        };
        if item.normalize_linkage() {
            report.links_cleared += 1;
        }
        if item.has_structural_link() {
            report.structural_links += 1;
        }
        insert_offer_item(conn, &item).await?;
        report.offer_items += 1;
    }

    append_audit(
        conn,
        EntityType::Offer,
        &report.offer.id,
        AuditAction::Imported,
        Some(serde_json::json!({
            "estimate_id": estimate_id,
            "offer_items": report.offer_items,
            "structural_links": report.structural_links,
        })),
    )
    .await?;
    Ok(report)
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
