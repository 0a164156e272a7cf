//! Persisted reconciliation passes.
//!
//! A pass matches every line of an offer against the baseline catalog,
//! applies the resulting price-list links, and upserts alerts keyed by
//! `(offer, offer line | baseline line, type)`:
//! - a detected alert with no row is created `open`
//! - a detected alert whose row is `open` is refreshed in place
//! - a detected alert whose row is terminal is left alone
//! - an `open` row the pass owns but no longer detects is deleted
//!
//! Re-running a pass therefore never duplicates or reopens alerts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::audit_detail::ReconciledDetail;
use tender_core::entities::Offer;
use tender_core::enums::{AlertStatus, AlertType, AuditAction, EntityType};
use tender_core::ids::PREFIX_ALERT;
use tender_recon::{AlertDraft, AlertKey, CatalogIndex, PassOutcome, ReconSettings, reconcile_items};

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, parse_enum};
use crate::repos::audit::append_audit;
use crate::repos::estimate_item::fetch_estimate_items;
use crate::repos::offer::require_offer;
use crate::repos::offer_item::{apply_link, fetch_offer_items};
use crate::repos::price_list::fetch_price_list;
use crate::repos::wbs_node::wbs_node_exists;
use crate::service::TenderService;

/// Result of one persisted pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReconcileReport {
    pub offer_id: String,
    /// Offer lines whose price-list linkage changed.
    pub links_updated: u32,
    #[serde(flatten)]
    pub summary: ReconciledDetail,
}

enum Upsert {
    Created,
    Refreshed,
    Suppressed,
}

impl TenderService {
    /// Reconcile an offer against its estimate, optionally scoped to the
    /// WBS node with path `scope`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for an empty scope and
    /// `DatabaseError::NotFound` for an unknown offer or WBS node.
    pub async fn reconcile_offer(
        &self,
        offer_id: &str,
        scope: Option<&str>,
    ) -> Result<ReconcileReport, DatabaseError> {
        if scope.is_some_and(|s| s.trim().is_empty()) {
            return Err(DatabaseError::Validation("scope must not be empty".into()));
        }
        let wtx = self.begin().await?;
        let result = run_pass(&wtx.tx, offer_id, scope, self.settings()).await;
        let report = wtx.finish("reconcile_offer", result).await?;
        tracing::info!(
            offer = offer_id,
            scope = scope.unwrap_or("*"),
            created = report.summary.alerts_created,
            refreshed = report.summary.alerts_refreshed,
            suppressed = report.summary.alerts_suppressed,
            cleared = report.summary.alerts_cleared,
            "reconciliation pass committed"
        );
        Ok(report)
    }
}

async fn run_pass(
    conn: &libsql::Connection,
    offer_id: &str,
    scope: Option<&str>,
    settings: &ReconSettings,
) -> Result<ReconcileReport, DatabaseError> {
    let offer = require_offer(conn, offer_id).await?;
    if let Some(path) = scope {
        if !wbs_node_exists(conn, &offer.estimate_id, path).await? {
            return Err(DatabaseError::not_found("wbs_node", path));
        }
    }

    let catalog = CatalogIndex::build(fetch_price_list(conn, &offer.estimate_id).await?);
    let baseline = fetch_estimate_items(conn, &offer.estimate_id).await?;
    let items = fetch_offer_items(conn, offer_id).await?;
    let outcome = reconcile_items(&items, &catalog, &baseline, scope, settings);

    for link in &outcome.links {
        apply_link(conn, link).await?;
    }

    let mut summary = ReconciledDetail {
        scope: scope.map(String::from),
        matched: outcome.matched,
        ambiguous: outcome.ambiguous,
        unmatched: outcome.unmatched,
        ..ReconciledDetail::default()
    };
    let now = Utc::now();
    for draft in &outcome.drafts {
        match upsert_alert(conn, &offer, draft, now).await? {
            Upsert::Created => summary.alerts_created += 1,
            Upsert::Refreshed => summary.alerts_refreshed += 1,
            Upsert::Suppressed => summary.alerts_suppressed += 1,
        }
    }
    summary.alerts_cleared = clear_stale(conn, offer_id, &outcome).await?;

    append_audit(
        conn,
        EntityType::Offer,
        offer_id,
        AuditAction::Reconciled,
        Some(serde_json::to_value(&summary)?),
    )
    .await?;

    Ok(ReconcileReport {
        offer_id: offer_id.to_string(),
        links_updated: u32::try_from(outcome.links.len()).unwrap_or(u32::MAX),
        summary,
    })
}

async fn upsert_alert(
    conn: &libsql::Connection,
    offer: &Offer,
    draft: &AlertDraft,
    now: DateTime<Utc>,
) -> Result<Upsert, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id, status FROM offer_alerts
             WHERE offer_id = ?1
               AND ifnull(offer_item_id, '') = ifnull(?2, '')
               AND ifnull(estimate_item_id, '') = ifnull(?3, '')
               AND type = ?4",
            libsql::params![
                offer.id.as_str(),
                draft.offer_item_id.as_deref(),
                draft.estimate_item_id.as_deref(),
                draft.alert_type.as_str()
            ],
        )
        .await?;
    let existing = match rows.next().await? {
        Some(row) => Some((
            row.get::<String>(0)?,
            parse_enum::<AlertStatus>(&row.get::<String>(1)?)?,
        )),
        None => None,
    };

    match existing {
        Some((_, status)) if status.is_terminal() => Ok(Upsert::Suppressed),
        Some((id, _)) => {
            conn.execute(
                "UPDATE offer_alerts
                 SET severity = ?2, message = ?3, actual = ?4, expected = ?5, delta = ?6, updated_at = ?7
                 WHERE id = ?1",
                libsql::params![
                    id.as_str(),
                    draft.severity.as_str(),
                    draft.message.as_str(),
                    draft.actual,
                    draft.expected,
                    draft.delta,
                    now.to_rfc3339()
                ],
            )
            .await?;
            Ok(Upsert::Refreshed)
        }
        None => {
            let id = generate_id(conn, PREFIX_ALERT).await?;
            conn.execute(
                "INSERT INTO offer_alerts (id, project_id, offer_id, offer_item_id, estimate_item_id,
                     type, severity, status, message, actual, expected, delta, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'open', ?8, ?9, ?10, ?11, ?12, ?12)",
                libsql::params![
                    id.as_str(),
                    offer.project_id.as_str(),
                    offer.id.as_str(),
                    draft.offer_item_id.as_deref(),
                    draft.estimate_item_id.as_deref(),
                    draft.alert_type.as_str(),
                    draft.severity.as_str(),
                    draft.message.as_str(),
                    draft.actual,
                    draft.expected,
                    draft.delta,
                    now.to_rfc3339()
                ],
            )
            .await?;
            Ok(Upsert::Created)
        }
    }
}

/// Delete open alerts the pass owns but did not detect again.
///
/// A pass owns the alerts of the offer lines it evaluated and the
/// `missing_baseline` alerts of the baseline lines in its scope.
async fn clear_stale(
    conn: &libsql::Connection,
    offer_id: &str,
    outcome: &PassOutcome,
) -> Result<u32, DatabaseError> {
    let detected: HashSet<AlertKey> = outcome.drafts.iter().map(AlertDraft::key).collect();

    let mut rows = conn
        .query(
            "SELECT id, offer_item_id, estimate_item_id, type FROM offer_alerts
             WHERE offer_id = ?1 AND status = 'open'",
            [offer_id],
        )
        .await?;
    let mut stale = Vec::new();
    while let Some(row) = rows.next().await? {
        let key = AlertKey {
            offer_item_id: get_opt_string(&row, 1)?,
            estimate_item_id: get_opt_string(&row, 2)?,
            alert_type: parse_enum::<AlertType>(&row.get::<String>(3)?)?,
        };
        let owned = match key.offer_item_id.as_deref() {
            Some(item) => outcome.evaluated_offer_items.contains(item),
            None => key
                .estimate_item_id
                .as_deref()
                .is_some_and(|line| outcome.evaluated_estimate_items.contains(line)),
        };
        if owned && !detected.contains(&key) {
            stale.push(row.get::<String>(0)?);
        }
    }

    for id in &stale {
        conn.execute("DELETE FROM offer_alerts WHERE id = ?1", [id.as_str()])
            .await?;
    }
    Ok(u32::try_from(stale.len()).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::AlertFilter;
    use crate::test_support::helpers::{
        aggregated_line, count_rows, detailed_line, test_baseline, test_offer, test_project,
        test_service,
    };
    use pretty_assertions::assert_eq;
    use tender_core::entities::{Estimate, OfferAlert};
    use tender_core::enums::{AlertSeverity, ResolutionStatus};
    use tender_core::requests::ResolveAlertRequest;

    async fn setup() -> (TenderService, Estimate, Offer) {
        let svc = test_service().await;
        let project = test_project(&svc).await;
        let estimate = test_baseline(&svc, &project).await;
        let offer = test_offer(
            &svc,
            &estimate,
            "ACME",
            vec![detailed_line(1, "A1", 10.0, 130.0), aggregated_line("Z9", None, 1.0, 50.0)],
        )
        .await;
        (svc, estimate, offer)
    }

    async fn alerts(svc: &TenderService, offer: &Offer) -> Vec<OfferAlert> {
        svc.list_alerts(&AlertFilter {
            offer_id: Some(offer.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    fn types(alerts: &[OfferAlert]) -> Vec<AlertType> {
        let mut types: Vec<AlertType> = alerts.iter().map(|a| a.alert_type).collect();
        types.sort();
        types
    }

    #[tokio::test]
    async fn first_pass_creates_alerts() {
        let (svc, _, offer) = setup().await;
        let report = svc.reconcile_offer(&offer.id, None).await.unwrap();
        assert_eq!(report.summary.alerts_created, 4);
        assert_eq!((report.summary.matched, report.summary.unmatched), (1, 1));

        let stored = alerts(&svc, &offer).await;
        assert_eq!(
            types(&stored),
            vec![
                AlertType::PriceMismatch,
                AlertType::MissingBaseline,
                AlertType::MissingBaseline,
                AlertType::Addendum,
            ]
        );
        let price = stored
            .iter()
            .find(|a| a.alert_type == AlertType::PriceMismatch)
            .unwrap();
        assert_eq!(price.severity, AlertSeverity::Error);
        assert_eq!(price.delta, Some(30.0));
        assert_eq!(price.status, AlertStatus::Open);
        assert!(stored.iter().all(|a| a.project_id == offer.project_id));
    }

    #[tokio::test]
    async fn rerun_refreshes_without_duplicates() {
        let (svc, _, offer) = setup().await;
        svc.reconcile_offer(&offer.id, None).await.unwrap();
        let report = svc.reconcile_offer(&offer.id, None).await.unwrap();

        assert_eq!(report.summary.alerts_created, 0);
        assert_eq!(report.summary.alerts_refreshed, 4);
        assert_eq!(report.summary.alerts_cleared, 0);
        assert_eq!(count_rows(&svc, "offer_alerts").await, 4);
    }

    #[tokio::test]
    async fn terminal_alerts_are_not_resurrected() {
        let (svc, _, offer) = setup().await;
        svc.reconcile_offer(&offer.id, None).await.unwrap();
        let addendum = alerts(&svc, &offer)
            .await
            .into_iter()
            .find(|a| a.alert_type == AlertType::Addendum)
            .unwrap();
        svc.resolve_alert(
            &addendum.id,
            &ResolveAlertRequest {
                status: Some(AlertStatus::Ignored),
                resolution_note: Some("accepted extra".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let report = svc.reconcile_offer(&offer.id, None).await.unwrap();
        assert_eq!(report.summary.alerts_suppressed, 1);
        assert_eq!(report.summary.alerts_created, 0);

        let after = svc.get_alert(&addendum.id).await.unwrap();
        assert_eq!(after.status, AlertStatus::Ignored);
        assert_eq!(after.resolution_note.as_deref(), Some("accepted extra"));
        assert_eq!(count_rows(&svc, "offer_alerts").await, 4);
    }

    #[tokio::test]
    async fn alerts_no_longer_detected_are_cleared() {
        let (svc, _, offer) = setup().await;
        svc.reconcile_offer(&offer.id, None).await.unwrap();

        let items = svc.list_offer_items(&offer.id).await.unwrap();
        svc.db()
            .conn()
            .execute(
                "UPDATE offer_items SET unit_price = 100.0 WHERE id = ?1",
                [items[0].id.as_str()],
            )
            .await
            .unwrap();

        let report = svc.reconcile_offer(&offer.id, None).await.unwrap();
        assert_eq!(report.summary.alerts_cleared, 1);
        assert!(!types(&alerts(&svc, &offer).await).contains(&AlertType::PriceMismatch));
    }

    #[tokio::test]
    async fn scoped_pass_leaves_other_subtrees_alone() {
        let (svc, _, offer) = setup().await;
        svc.reconcile_offer(&offer.id, None).await.unwrap();

        let report = svc.reconcile_offer(&offer.id, Some("2")).await.unwrap();
        assert_eq!(report.summary.scope.as_deref(), Some("2"));
        assert_eq!(report.summary.alerts_refreshed, 1);
        assert_eq!(report.summary.alerts_cleared, 0);
        assert_eq!(count_rows(&svc, "offer_alerts").await, 4);
    }

    #[tokio::test]
    async fn scoped_first_pass_only_raises_subtree_alerts() {
        let (svc, _, offer) = setup().await;
        let report = svc.reconcile_offer(&offer.id, Some("1")).await.unwrap();
        assert_eq!(report.summary.alerts_created, 2);
        assert_eq!(
            types(&alerts(&svc, &offer).await),
            vec![AlertType::PriceMismatch, AlertType::MissingBaseline]
        );
    }

    #[tokio::test]
    async fn invalid_scopes_are_rejected() {
        let (svc, _, offer) = setup().await;
        assert!(matches!(
            svc.reconcile_offer(&offer.id, Some(" ")).await,
            Err(DatabaseError::Validation(_))
        ));
        assert!(matches!(
            svc.reconcile_offer(&offer.id, Some("9")).await,
            Err(DatabaseError::NotFound { ref entity, .. }) if entity == "wbs_node"
        ));
        assert!(matches!(
            svc.reconcile_offer("off-missing", None).await,
            Err(DatabaseError::NotFound { ref entity, .. }) if entity == "offer"
        ));
        assert_eq!(count_rows(&svc, "offer_alerts").await, 0);
    }

    #[tokio::test]
    async fn code_match_links_aggregated_line() {
        let svc = test_service().await;
        let project = test_project(&svc).await;
        let estimate = test_baseline(&svc, &project).await;
        let offer = test_offer(&svc, &estimate, "ACME", vec![aggregated_line("C1", None, 40.0, 15.0)]).await;

        let report = svc.reconcile_offer(&offer.id, None).await.unwrap();
        assert_eq!(report.links_updated, 1);

        let item = &svc.list_offer_items(&offer.id).await.unwrap()[0];
        let catalog = svc.list_price_list(&estimate.id).await.unwrap();
        assert_eq!(item.price_list_item_id.as_deref(), Some(catalog[2].id.as_str()));
        assert_eq!(item.resolution_status, ResolutionStatus::Resolved);

        let again = svc.reconcile_offer(&offer.id, None).await.unwrap();
        assert_eq!(again.links_updated, 0);
    }

    #[tokio::test]
    async fn concurrent_passes_are_serialized() {
        let (svc, _, offer) = setup().await;
        let (first, second) = tokio::join!(
            svc.reconcile_offer(&offer.id, None),
            svc.reconcile_offer(&offer.id, None)
        );
        let created = first.unwrap().summary.alerts_created + second.unwrap().summary.alerts_created;
        assert_eq!(created, 4);
        assert_eq!(count_rows(&svc, "offer_alerts").await, 4);
    }

    #[tokio::test]
    async fn pass_is_audited() {
        let (svc, _, offer) = setup().await;
        svc.reconcile_offer(&offer.id, None).await.unwrap();
        let entries = svc
            .query_audit(&crate::repos::AuditFilter {
                entity_id: Some(offer.id.clone()),
                action: Some(AuditAction::Reconciled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        let detail: ReconciledDetail =
            serde_json::from_value(entries[0].detail.clone().unwrap()).unwrap();
        assert_eq!(detail.alerts_created, 4);
    }
}
