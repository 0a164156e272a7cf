//! Alert lifecycle and offer-line mapping.
//!
//! `open → resolved | ignored`; terminal alerts never move again. Resolving
//! an `ambiguous_match` or `addendum` alert with a selected price-list item
//! maps the offer line onto that item, which also resolves every other open
//! alert of the line.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::audit_detail::{MappedDetail, StatusChangedDetail};
use tender_core::entities::{OfferAlert, OfferItem};
use tender_core::enums::{AlertStatus, AuditAction, EntityType, OfferItemOrigin, ResolutionStatus};
use tender_core::requests::ResolveAlertRequest;

use crate::error::DatabaseError;
use crate::repos::alert::{open_alerts_for_item, require_alert};
use crate::repos::audit::append_audit;
use crate::repos::offer::require_offer;
use crate::repos::offer_item::require_offer_item;
use crate::repos::price_list::fetch_price_list_item;
use crate::service::TenderService;

/// Result of mapping an offer line onto a price-list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MappingOutcome {
    pub offer_item: OfferItem,
    /// Open alerts of the line resolved by the mapping.
    pub cascaded_alerts: Vec<String>,
}

impl TenderService {
    /// Move an open alert to `resolved` or `ignored`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::Validation` for a missing or non-terminal status, or a
    ///   selection the alert cannot take
    /// - `DatabaseError::NotFound` for an unknown alert
    /// - `DatabaseError::Conflict` when the alert is already terminal; nothing
    ///   is changed
    pub async fn resolve_alert(
        &self,
        alert_id: &str,
        request: &ResolveAlertRequest,
    ) -> Result<OfferAlert, DatabaseError> {
        let status = request.validate()?;
        let wtx = self.begin().await?;
        let result = resolve_in(&wtx.tx, alert_id, status, request).await;
        let alert = wtx.finish("resolve_alert", result).await?;
        tracing::info!(alert = alert_id, status = %status, "alert resolved");
        Ok(alert)
    }

    /// Map an offer line onto a price-list item of its estimate.
    ///
    /// Clears the candidates, marks the line resolved and baseline-origin, and
    /// resolves its open alerts. With `apply_approved_price` the line takes
    /// the catalog price.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown line and
    /// `DatabaseError::Validation` for a price-list item outside the estimate.
    pub async fn map_offer_item(
        &self,
        offer_item_id: &str,
        price_list_item_id: &str,
        apply_approved_price: bool,
    ) -> Result<MappingOutcome, DatabaseError> {
        let wtx = self.begin().await?;
        let result =
            map_in(&wtx.tx, offer_item_id, price_list_item_id, apply_approved_price, None, Utc::now()).await;
        let outcome = wtx.finish("map_offer_item", result).await?;
        tracing::info!(
            offer_item = offer_item_id,
            price_list_item = price_list_item_id,
            cascaded = outcome.cascaded_alerts.len(),
            "offer item mapped"
        );
        Ok(outcome)
    }
}

async fn resolve_in(
    conn: &libsql::Connection,
    alert_id: &str,
    status: AlertStatus,
    request: &ResolveAlertRequest,
) -> Result<OfferAlert, DatabaseError> {
    let alert = require_alert(conn, alert_id).await?;
    if !alert.status.can_transition_to(status) {
        return Err(DatabaseError::Conflict(format!(
            "alert {alert_id} is already {}",
            alert.status
        )));
    }

    let selection = request.selected_price_list_item_id.as_deref();
    let mapped_item = match selection {
        Some(_) if !alert.alert_type.accepts_mapping() => {
            return Err(DatabaseError::Validation(format!(
                "{} alerts do not take a price list selection",
                alert.alert_type
            )));
        }
        Some(_) => Some(alert.offer_item_id.clone().ok_or_else(|| {
            DatabaseError::Validation(format!("alert {alert_id} has no offer item to map"))
        })?),
        None => None,
    };

    let now = Utc::now();
    let updated = conn
        .execute(
            "UPDATE offer_alerts
             SET status = ?2, resolution_note = ?3, resolved_by = ?4, resolved_at = ?5, updated_at = ?5
             WHERE id = ?1 AND status = 'open'",
            libsql::params![
                alert_id,
                status.as_str(),
                request.resolution_note.as_deref(),
                request.resolved_by.as_deref(),
                now.to_rfc3339()
            ],
        )
        .await?;
    if updated == 0 {
        return Err(DatabaseError::Conflict(format!(
            "alert {alert_id} was resolved concurrently"
        )));
    }

    append_audit(
        conn,
        EntityType::Alert,
        alert_id,
        AuditAction::StatusChanged,
        Some(serde_json::to_value(StatusChangedDetail {
            from: alert.status.as_str().to_string(),
            to: status.as_str().to_string(),
            reason: request.resolution_note.clone(),
        })?),
    )
    .await?;

    if let (Some(offer_item_id), Some(price_list_item_id)) = (mapped_item, selection) {
        map_in(
            conn,
            &offer_item_id,
            price_list_item_id,
            request.apply_approved_price,
            request.resolved_by.as_deref(),
            now,
        )
        .await?;
    }

    require_alert(conn, alert_id).await
}

async fn map_in(
    conn: &libsql::Connection,
    offer_item_id: &str,
    price_list_item_id: &str,
    apply_approved_price: bool,
    resolved_by: Option<&str>,
    now: DateTime<Utc>,
) -> Result<MappingOutcome, DatabaseError> {
    let item = require_offer_item(conn, offer_item_id).await?;
    let offer = require_offer(conn, &item.offer_id).await?;
    let pli = fetch_price_list_item(conn, price_list_item_id)
        .await?
        .filter(|p| p.estimate_id == offer.estimate_id)
        .ok_or_else(|| {
            DatabaseError::Validation(format!(
                "price list item {price_list_item_id} is not in estimate {}",
                offer.estimate_id
            ))
        })?;

    let (unit_price, amount) = if apply_approved_price {
        (pli.price, Some(item.quantity * pli.price))
    } else {
        (item.unit_price, item.amount)
    };
    conn.execute(
        "UPDATE offer_items
         SET price_list_item_id = ?2, candidate_price_list_item_ids = '[]', resolution_status = ?3,
             origin = ?4, unit_price = ?5, amount = ?6, updated_at = ?7
         WHERE id = ?1",
        libsql::params![
            offer_item_id,
            pli.id.as_str(),
            ResolutionStatus::Resolved.as_str(),
            OfferItemOrigin::Baseline.as_str(),
            unit_price,
            amount,
            now.to_rfc3339()
        ],
    )
    .await?;

    let note = format!("resolved by mapping to price list item {}", pli.code);
    let mut cascaded_alerts = Vec::new();
    for alert in open_alerts_for_item(conn, offer_item_id).await? {
        conn.execute(
            "UPDATE offer_alerts
             SET status = 'resolved', resolution_note = ?2, resolved_by = ?3, resolved_at = ?4, updated_at = ?4
             WHERE id = ?1 AND status = 'open'",
            libsql::params![alert.id.as_str(), note.as_str(), resolved_by, now.to_rfc3339()],
        )
        .await?;
        append_audit(
            conn,
            EntityType::Alert,
            &alert.id,
            AuditAction::StatusChanged,
            Some(serde_json::to_value(StatusChangedDetail {
                from: AlertStatus::Open.as_str().to_string(),
                to: AlertStatus::Resolved.as_str().to_string(),
                reason: Some(note.clone()),
            })?),
        )
        .await?;
        cascaded_alerts.push(alert.id);
    }

    append_audit(
        conn,
        EntityType::OfferItem,
        offer_item_id,
        AuditAction::Mapped,
        Some(serde_json::to_value(MappedDetail {
            price_list_item_id: pli.id.clone(),
            applied_price: apply_approved_price,
            cascaded_alerts: cascaded_alerts.clone(),
        })?),
    )
    .await?;

    Ok(MappingOutcome {
        offer_item: require_offer_item(conn, offer_item_id).await?,
        cascaded_alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::AlertFilter;
    use crate::test_support::helpers::{
        aggregated_line, detailed_line, test_baseline, test_offer, test_project, test_service,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tender_core::entities::{Estimate, Offer, PriceListItem};
    use tender_core::enums::AlertType;

    struct Fixture {
        svc: TenderService,
        estimate: Estimate,
        offer: Offer,
        catalog: Vec<PriceListItem>,
    }

    /// Offer with a mispriced and over-quantified detailed line (#1 A1), an
    /// unknown extra (Z9) and an ambiguous description-only line.
    async fn fixture() -> Fixture {
        let svc = test_service().await;
        let project = test_project(&svc).await;
        let estimate = test_baseline(&svc, &project).await;
        let mut ambiguous = aggregated_line("X0", Some("concrete slab steel rebar"), 1.0, 10.0);
        ambiguous.code = None;
        let offer = test_offer(
            &svc,
            &estimate,
            "ACME",
            vec![
                detailed_line(1, "A1", 12.0, 130.0),
                aggregated_line("Z9", None, 1.0, 50.0),
                ambiguous,
            ],
        )
        .await;
        svc.reconcile_offer(&offer.id, None).await.unwrap();
        let catalog = svc.list_price_list(&estimate.id).await.unwrap();
        Fixture {
            svc,
            estimate,
            offer,
            catalog,
        }
    }

    async fn alert_of(fx: &Fixture, alert_type: AlertType) -> OfferAlert {
        fx.svc
            .list_alerts(&AlertFilter {
                offer_id: Some(fx.offer.id.clone()),
                alert_type: Some(alert_type),
                ..Default::default()
            })
            .await
            .unwrap()
            .remove(0)
    }

    fn resolved(note: &str) -> ResolveAlertRequest {
        ResolveAlertRequest {
            status: Some(AlertStatus::Resolved),
            resolution_note: Some(note.into()),
            resolved_by: Some("estimator".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resolution_is_terminal() {
        let fx = fixture().await;
        let price = alert_of(&fx, AlertType::PriceMismatch).await;

        let first = fx.svc.resolve_alert(&price.id, &resolved("agreed")).await.unwrap();
        assert_eq!(first.status, AlertStatus::Resolved);
        assert_eq!(first.resolved_by.as_deref(), Some("estimator"));
        assert!(first.resolved_at.is_some());

        let err = fx
            .svc
            .resolve_alert(
                &price.id,
                &ResolveAlertRequest {
                    status: Some(AlertStatus::Ignored),
                    resolution_note: Some("changed my mind".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let after = fx.svc.get_alert(&price.id).await.unwrap();
        assert_eq!(after.status, AlertStatus::Resolved);
        assert_eq!(after.resolved_at, first.resolved_at);
        assert_eq!(after.resolution_note.as_deref(), Some("agreed"));
    }

    #[tokio::test]
    async fn concurrent_resolutions_let_exactly_one_win() {
        let fx = fixture().await;
        let price = alert_of(&fx, AlertType::PriceMismatch).await;
        let left = resolved("left");
        let right = resolved("right");

        let (first, second) = tokio::join!(
            fx.svc.resolve_alert(&price.id, &left),
            fx.svc.resolve_alert(&price.id, &right)
        );

        let (winner, loser) = match (first, second) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            (first, second) => panic!("expected one winner, got {first:?} and {second:?}"),
        };
        assert!(matches!(loser, DatabaseError::Conflict(_)));

        let stored = fx.svc.get_alert(&price.id).await.unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert_eq!(stored.resolution_note, winner.resolution_note);
        assert_eq!(stored.resolved_at, winner.resolved_at);
        assert!(matches!(stored.resolution_note.as_deref(), Some("left" | "right")));
    }

    #[rstest]
    #[case(AlertStatus::Resolved)]
    #[case(AlertStatus::Ignored)]
    #[tokio::test]
    async fn terminal_alerts_reject_every_transition(#[case] first: AlertStatus) {
        let fx = fixture().await;
        let addendum = alert_of(&fx, AlertType::Addendum).await;
        let to = |status| ResolveAlertRequest {
            status: Some(status),
            ..Default::default()
        };
        fx.svc.resolve_alert(&addendum.id, &to(first)).await.unwrap();

        for next in [AlertStatus::Resolved, AlertStatus::Ignored] {
            let err = fx.svc.resolve_alert(&addendum.id, &to(next)).await.unwrap_err();
            assert!(matches!(err, DatabaseError::Conflict(_)));
        }
        assert_eq!(fx.svc.get_alert(&addendum.id).await.unwrap().status, first);
    }

    #[tokio::test]
    async fn missing_status_is_rejected_before_lookup() {
        let fx = fixture().await;
        let err = fx
            .svc
            .resolve_alert("alr-missing", &ResolveAlertRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));

        let err = fx.svc.resolve_alert("alr-missing", &resolved("x")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn selection_on_price_alert_is_rejected() {
        let fx = fixture().await;
        let price = alert_of(&fx, AlertType::PriceMismatch).await;
        let request = ResolveAlertRequest {
            selected_price_list_item_id: Some(fx.catalog[0].id.clone()),
            ..resolved("pick")
        };
        let err = fx.svc.resolve_alert(&price.id, &request).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert_eq!(fx.svc.get_alert(&price.id).await.unwrap().status, AlertStatus::Open);
    }

    #[tokio::test]
    async fn ambiguous_selection_maps_the_line() {
        let fx = fixture().await;
        let ambiguous = alert_of(&fx, AlertType::AmbiguousMatch).await;
        let item_id = ambiguous.offer_item_id.clone().unwrap();
        let before = fx.svc.get_offer_item(&item_id).await.unwrap();
        assert_eq!(before.candidate_price_list_item_ids.len(), 2);

        let request = ResolveAlertRequest {
            selected_price_list_item_id: Some(fx.catalog[1].id.clone()),
            ..resolved("it is rebar")
        };
        let alert = fx.svc.resolve_alert(&ambiguous.id, &request).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.resolution_note.as_deref(), Some("it is rebar"));

        let item = fx.svc.get_offer_item(&item_id).await.unwrap();
        assert_eq!(item.price_list_item_id.as_deref(), Some(fx.catalog[1].id.as_str()));
        assert!(item.candidate_price_list_item_ids.is_empty());
        assert_eq!(item.resolution_status, ResolutionStatus::Resolved);
        assert!((item.unit_price - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn addendum_selection_applies_approved_price() {
        let fx = fixture().await;
        let addendum = alert_of(&fx, AlertType::Addendum).await;
        let request = ResolveAlertRequest {
            selected_price_list_item_id: Some(fx.catalog[1].id.clone()),
            apply_approved_price: true,
            ..resolved("same as rebar")
        };
        fx.svc.resolve_alert(&addendum.id, &request).await.unwrap();

        let item = fx
            .svc
            .get_offer_item(addendum.offer_item_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(item.origin, OfferItemOrigin::Baseline);
        assert!((item.unit_price - 2.0).abs() < f64::EPSILON);
        assert_eq!(item.amount, Some(2.0));
    }

    #[tokio::test]
    async fn mapping_cascades_to_open_alerts() {
        let fx = fixture().await;
        let price = alert_of(&fx, AlertType::PriceMismatch).await;
        let quantity = alert_of(&fx, AlertType::QuantityMismatch).await;
        let item_id = price.offer_item_id.clone().unwrap();

        let outcome = fx
            .svc
            .map_offer_item(&item_id, &fx.catalog[0].id, true)
            .await
            .unwrap();
        let mut cascaded = outcome.cascaded_alerts.clone();
        cascaded.sort();
        let mut expected = vec![price.id.clone(), quantity.id.clone()];
        expected.sort();
        assert_eq!(cascaded, expected);

        for id in [&price.id, &quantity.id] {
            let alert = fx.svc.get_alert(id).await.unwrap();
            assert_eq!(alert.status, AlertStatus::Resolved);
            assert!(alert.resolution_note.unwrap().contains("A1"));
        }
        assert!((outcome.offer_item.unit_price - 100.0).abs() < f64::EPSILON);
        assert_eq!(outcome.offer_item.amount, Some(1200.0));
    }

    #[tokio::test]
    async fn mapping_rejects_foreign_price_list_item() {
        let fx = fixture().await;
        let other = test_baseline(&fx.svc, &fx.svc.get_project(&fx.estimate.project_id).await.unwrap()).await;
        let foreign = fx.svc.list_price_list(&other.id).await.unwrap();
        let items = fx.svc.list_offer_items(&fx.offer.id).await.unwrap();

        let err = fx
            .svc
            .map_offer_item(&items[1].id, &foreign[0].id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert!(fx.svc.get_offer_item(&items[1].id).await.unwrap().price_list_item_id.is_none());
    }

    #[tokio::test]
    async fn mapped_line_covers_baseline_on_next_pass() {
        let fx = fixture().await;
        let addendum = alert_of(&fx, AlertType::Addendum).await;
        let request = ResolveAlertRequest {
            selected_price_list_item_id: Some(fx.catalog[2].id.clone()),
            ..resolved("excavation")
        };
        fx.svc.resolve_alert(&addendum.id, &request).await.unwrap();

        let report = fx.svc.reconcile_offer(&fx.offer.id, None).await.unwrap();
        assert_eq!(report.summary.alerts_cleared, 1);
        let missing = fx
            .svc
            .list_alerts(&AlertFilter {
                offer_id: Some(fx.offer.id.clone()),
                alert_type: Some(AlertType::MissingBaseline),
                status: Some(AlertStatus::Open),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(missing.len(), 1, "only the rebar line stays uncovered");
        assert_eq!(fx.svc.get_alert(&addendum.id).await.unwrap().status, AlertStatus::Resolved);
    }
}
