//! Merging baseline estimates into a new estimate.
//!
//! Catalog entries are deduplicated by `(code, description)` with the first
//! occurrence in request order kept; lines are copied with their price-list
//! references re-pointed at the kept entries, and the WBS node rows are
//! rebuilt over the union. Source estimates are left untouched.

use std::collections::HashMap;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::audit_detail::MergedDetail;
use tender_core::entities::{Estimate, EstimateItem};
use tender_core::enums::{AuditAction, EntityType};
use tender_core::requests::{EstimateItemInput, MergeRequest, PriceListItemInput};

use crate::error::DatabaseError;
use crate::repos::audit::append_audit;
use crate::repos::estimate::{clear_baseline, fetch_estimate, insert_estimate, require_estimate};
use crate::repos::estimate_item::{fetch_estimate_items, insert_estimate_item};
use crate::repos::price_list::{fetch_price_list, insert_price_list_item};
use crate::repos::project::fetch_project;
use crate::repos::wbs_node::rebuild_wbs_nodes;
use crate::service::TenderService;

/// A catalog entry dropped because an earlier source had the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergeDuplicate {
    pub code: String,
    pub description: String,
    /// Source estimate of the dropped entry.
    pub estimate_id: String,
    pub dropped_id: String,
    /// Entry of the merged estimate that replaces it.
    pub kept_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergeReport {
    pub sources: Vec<String>,
    pub price_list_items: u32,
    pub duplicates: Vec<MergeDuplicate>,
    pub estimate_items: u32,
    pub wbs_nodes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergeOutcome {
    pub estimate: Estimate,
    pub report: MergeReport,
}

impl TenderService {
    /// Merge two or more estimates of a project into a new one.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for fewer than two distinct ids or
    /// an id that is not an estimate of the project, and
    /// `DatabaseError::NotFound` for an unknown project. Nothing is written
    /// on error.
    pub async fn merge_estimates(
        &self,
        project_id: &str,
        request: &MergeRequest,
    ) -> Result<MergeOutcome, DatabaseError> {
        request.validate()?;
        let wtx = self.begin().await?;
        let result = merge_in(&wtx.tx, project_id, request).await;
        let outcome = wtx.finish("merge_estimates", result).await?;
        tracing::info!(
            estimate = %outcome.estimate.id,
            sources = outcome.report.sources.len(),
            duplicates = outcome.report.duplicates.len(),
            "estimates merged"
        );
        Ok(outcome)
    }
}

async fn merge_in(
    conn: &libsql::Connection,
    project_id: &str,
    request: &MergeRequest,
) -> Result<MergeOutcome, DatabaseError> {
    fetch_project(conn, project_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("project", project_id))?;

    if request.set_as_baseline {
        clear_baseline(conn, project_id).await?;
    }
    let placeholder = request.name.as_deref().unwrap_or("Merged estimate");
    let merged = insert_estimate(
        conn,
        project_id,
        placeholder,
        request.set_as_baseline,
        request.price_list_name.as_deref(),
    )
    .await?;

    let mut kept: HashMap<(String, String), String> = HashMap::new();
    let mut report = MergeReport {
        sources: Vec::with_capacity(request.estimate_ids.len()),
        price_list_items: 0,
        duplicates: Vec::new(),
        estimate_items: 0,
        wbs_nodes: 0,
    };
    let mut source_names = Vec::with_capacity(request.estimate_ids.len());
    let mut first_price_list_name = None;

    for source_id in &request.estimate_ids {
        let source = fetch_estimate(conn, source_id)
            .await?
            .filter(|e| e.project_id == project_id)
            .ok_or_else(|| {
                DatabaseError::Validation(format!(
                    "estimate {source_id} is not an estimate of project {project_id}"
                ))
            })?;

        let mut remap: HashMap<String, String> = HashMap::new();
        for entry in fetch_price_list(conn, source_id).await? {
            let key = (entry.code.clone(), entry.description.clone());
            if let Some(kept_id) = kept.get(&key) {
                report.duplicates.push(MergeDuplicate {
                    code: entry.code,
                    description: entry.description,
                    estimate_id: source_id.clone(),
                    dropped_id: entry.id.clone(),
                    kept_id: kept_id.clone(),
                });
                remap.insert(entry.id, kept_id.clone());
                continue;
            }
            let input = PriceListItemInput {
                code: entry.code,
                description: entry.description,
                unit: entry.unit,
                price: entry.price,
            };
            let copy = insert_price_list_item(conn, project_id, &merged.id, &input).await?;
            kept.insert(key, copy.id.clone());
            remap.insert(entry.id, copy.id);
            report.price_list_items += 1;
        }

        for line in fetch_estimate_items(conn, source_id).await? {
            let price_list_item_id = line
                .price_list_item_id
                .as_ref()
                .and_then(|id| remap.get(id))
                .cloned();
            insert_estimate_item(
                conn,
                project_id,
                &merged.id,
                price_list_item_id.as_deref(),
                &copy_input(line),
            )
            .await?;
            report.estimate_items += 1;
        }

        if first_price_list_name.is_none() {
            first_price_list_name = source.price_list_name.clone();
        }
        source_names.push(source.name);
        report.sources.push(source.id);
    }

    report.wbs_nodes = rebuild_wbs_nodes(conn, &merged.id).await?;

    let name = request
        .name
        .clone()
        .unwrap_or_else(|| format!("Merged: {}", source_names.join(" + ")));
    let price_list_name = request.price_list_name.clone().or(first_price_list_name);
    conn.execute(
        "UPDATE estimates SET name = ?2, price_list_name = ?3, updated_at = ?4 WHERE id = ?1",
        libsql::params![
            merged.id.as_str(),
            name.as_str(),
            price_list_name.as_deref(),
            Utc::now().to_rfc3339()
        ],
    )
    .await?;

    append_audit(
        conn,
        EntityType::Estimate,
        &merged.id,
        AuditAction::Merged,
        Some(serde_json::to_value(MergedDetail {
            sources: report.sources.clone(),
            price_list_items: report.price_list_items,
            duplicates_dropped: u32::try_from(report.duplicates.len()).unwrap_or(u32::MAX),
            estimate_items: report.estimate_items,
            wbs_nodes: report.wbs_nodes,
        })?),
    )
    .await?;

    Ok(MergeOutcome {
        estimate: require_estimate(conn, &merged.id).await?,
        report,
    })
}

fn copy_input(line: EstimateItem) -> EstimateItemInput {
    EstimateItemInput {
        progressive: line.progressive,
        code: line.code,
        description: line.description,
        unit: line.unit,
        quantity: line.quantity,
        unit_price: line.unit_price,
        amount: Some(line.amount),
        price_list_code: None,
        wbs: line.wbs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{
        baseline_bundle, catalog_entry, count_rows, estimate_line, test_project, test_service,
    };
    use pretty_assertions::assert_eq;
    use tender_core::entities::Project;
    use tender_core::filter::ItemFilter;
    use tender_core::requests::EstimateImport;

    fn second_bundle() -> EstimateImport {
        EstimateImport {
            name: "Lotto B".into(),
            is_baseline: false,
            price_list_name: None,
            price_list: vec![
                catalog_entry("A1", "Concrete slab", 100.0),
                catalog_entry("A1", "Concrete slab reinforced", 140.0),
                catalog_entry("D1", "Roof tiles", 30.0),
            ],
            items: vec![
                estimate_line(1, "A1", 5.0, 100.0, &[Some("3"), Some("3.1")]),
                estimate_line(2, "D1", 80.0, 30.0, &[Some("3"), Some("3.2")]),
            ],
        }
    }

    async fn two_sources() -> (TenderService, Project, Estimate, Estimate) {
        let svc = test_service().await;
        let project = test_project(&svc).await;
        let first = svc
            .import_estimate(&project.id, &baseline_bundle("Lotto A"))
            .await
            .unwrap()
            .estimate;
        let second = svc.import_estimate(&project.id, &second_bundle()).await.unwrap().estimate;
        (svc, project, first, second)
    }

    fn request(first: &Estimate, second: &Estimate) -> MergeRequest {
        MergeRequest {
            estimate_ids: vec![first.id.clone(), second.id.clone()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicates_are_dropped_and_reported() {
        let (svc, _, first, second) = two_sources().await;
        let outcome = svc.merge_estimates(&first.project_id, &request(&first, &second)).await.unwrap();

        assert_eq!(outcome.report.price_list_items, 5);
        assert_eq!(outcome.report.estimate_items, 5);
        assert_eq!(outcome.report.duplicates.len(), 1);

        let dup = &outcome.report.duplicates[0];
        assert_eq!((dup.code.as_str(), dup.description.as_str()), ("A1", "Concrete slab"));
        assert_eq!(dup.estimate_id, second.id);

        let catalog = svc.list_price_list(&outcome.estimate.id).await.unwrap();
        assert_eq!(dup.kept_id, catalog[0].id);
        let codes: Vec<(&str, &str)> = catalog
            .iter()
            .map(|p| (p.code.as_str(), p.description.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("A1", "Concrete slab"),
                ("B1", "Steel rebar"),
                ("C1", "Excavation trench"),
                ("A1", "Concrete slab reinforced"),
                ("D1", "Roof tiles"),
            ]
        );
    }

    #[tokio::test]
    async fn lines_point_at_kept_entries() {
        let (svc, _, first, second) = two_sources().await;
        let outcome = svc.merge_estimates(&first.project_id, &request(&first, &second)).await.unwrap();
        let kept_id = outcome.report.duplicates[0].kept_id.clone();

        let lines = svc
            .list_estimate_items(&ItemFilter::Estimate {
                estimate_id: outcome.estimate.id.clone(),
            })
            .await
            .unwrap();
        let on_slab = lines
            .iter()
            .filter(|l| l.price_list_item_id.as_deref() == Some(kept_id.as_str()))
            .count();
        assert_eq!(on_slab, 2);
        assert!(lines.iter().all(|l| l.estimate_id == outcome.estimate.id));
    }

    #[tokio::test]
    async fn wbs_covers_the_union() {
        let (svc, _, first, second) = two_sources().await;
        let outcome = svc.merge_estimates(&first.project_id, &request(&first, &second)).await.unwrap();
        assert_eq!(outcome.report.wbs_nodes, 7);

        let roots: Vec<String> = svc
            .wbs_tree(&outcome.estimate.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(roots, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn default_name_and_baseline_flag() {
        let (svc, project, first, second) = two_sources().await;
        let merge = MergeRequest {
            set_as_baseline: true,
            ..request(&first, &second)
        };
        let outcome = svc.merge_estimates(&project.id, &merge).await.unwrap();

        assert_eq!(outcome.estimate.name, "Merged: Lotto A + Lotto B");
        assert_eq!(outcome.estimate.price_list_name.as_deref(), Some("Regional 2026"));
        assert!(outcome.estimate.is_baseline);
        assert!(!svc.get_estimate(&first.id).await.unwrap().is_baseline);
        let baseline = svc.baseline_estimate(&project.id).await.unwrap().unwrap();
        assert_eq!(baseline.id, outcome.estimate.id);
    }

    #[tokio::test]
    async fn sources_are_left_untouched() {
        let (svc, _, first, second) = two_sources().await;
        svc.merge_estimates(&first.project_id, &request(&first, &second)).await.unwrap();

        assert_eq!(svc.list_price_list(&first.id).await.unwrap().len(), 3);
        assert_eq!(svc.list_price_list(&second.id).await.unwrap().len(), 3);
        assert_eq!(svc.get_estimate(&first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn foreign_source_rolls_back_everything() {
        let (svc, _, first, second) = two_sources().await;
        let other_project = svc.create_project("Elsewhere", None).await.unwrap();
        let foreign = svc
            .import_estimate(&other_project.id, &baseline_bundle("Foreign"))
            .await
            .unwrap()
            .estimate;
        let before = (
            count_rows(&svc, "estimates").await,
            count_rows(&svc, "price_list_items").await,
            count_rows(&svc, "estimate_items").await,
            count_rows(&svc, "wbs_nodes").await,
        );

        let merge = MergeRequest {
            estimate_ids: vec![first.id.clone(), second.id.clone(), foreign.id.clone()],
            set_as_baseline: true,
            ..Default::default()
        };
        let err = svc.merge_estimates(&first.project_id, &merge).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(ref msg) if msg.contains(&foreign.id)));

        let after = (
            count_rows(&svc, "estimates").await,
            count_rows(&svc, "price_list_items").await,
            count_rows(&svc, "estimate_items").await,
            count_rows(&svc, "wbs_nodes").await,
        );
        assert_eq!(before, after);
        assert!(svc.get_estimate(&first.id).await.unwrap().is_baseline);
    }

    #[tokio::test]
    async fn needs_two_distinct_sources() {
        let (svc, project, first, _) = two_sources().await;
        let err = svc
            .merge_estimates(
                &project.id,
                &MergeRequest {
                    estimate_ids: vec![first.id.clone(), first.id.clone()],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }
}
