//! Offer alert repository: lookups, filtered listing and status tallies.
//!
//! Alerts are written by reconciliation passes and moved out of `open` by
//! resolution; see [`crate::reconcile`] and [`crate::resolution`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::entities::OfferAlert;
use tender_core::enums::{AlertStatus, AlertType};

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, get_u32, parse_datetime, parse_enum, parse_optional_datetime};
use crate::service::TenderService;

pub(crate) const SELECT_COLS: &str = "id, project_id, offer_id, offer_item_id, estimate_item_id, \
     type, severity, status, message, actual, expected, delta, resolution_note, resolved_by, \
     resolved_at, created_at, updated_at";

pub(crate) fn row_to_alert(row: &libsql::Row) -> Result<OfferAlert, DatabaseError> {
    Ok(OfferAlert {
        id: row.get(0)?,
        project_id: row.get(1)?,
        offer_id: row.get(2)?,
        offer_item_id: get_opt_string(row, 3)?,
        estimate_item_id: get_opt_string(row, 4)?,
        alert_type: parse_enum(&row.get::<String>(5)?)?,
        severity: parse_enum(&row.get::<String>(6)?)?,
        status: parse_enum(&row.get::<String>(7)?)?,
        message: row.get(8)?,
        actual: row.get::<Option<f64>>(9)?,
        expected: row.get::<Option<f64>>(10)?,
        delta: row.get::<Option<f64>>(11)?,
        resolution_note: get_opt_string(row, 12)?,
        resolved_by: get_opt_string(row, 13)?,
        resolved_at: parse_optional_datetime(get_opt_string(row, 14)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(15)?)?,
        updated_at: parse_datetime(&row.get::<String>(16)?)?,
    })
}

pub(crate) async fn require_alert(conn: &libsql::Connection, id: &str) -> Result<OfferAlert, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM offer_alerts WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => row_to_alert(&row),
        None => Err(DatabaseError::not_found("alert", id)),
    }
}

/// Open alerts raised on one offer line.
pub(crate) async fn open_alerts_for_item(
    conn: &libsql::Connection,
    offer_item_id: &str,
) -> Result<Vec<OfferAlert>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM offer_alerts
                 WHERE offer_item_id = ?1 AND status = 'open' ORDER BY rowid"
            ),
            [offer_item_id],
        )
        .await?;
    let mut alerts = Vec::new();
    while let Some(row) = rows.next().await? {
        alerts.push(row_to_alert(&row)?);
    }
    Ok(alerts)
}

/// Filter criteria for alert listings.
#[derive(Debug, Default)]
pub struct AlertFilter {
    pub project_id: Option<String>,
    pub offer_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub limit: Option<u32>,
}

/// Grouping of [`TenderService::alert_summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SummaryGroup {
    Offer,
    Estimate,
}

/// Alert tallies of one offer or estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AlertSummary {
    pub group_id: String,
    pub open: u32,
    pub resolved: u32,
    pub ignored: u32,
}

impl TenderService {
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn get_alert(&self, id: &str) -> Result<OfferAlert, DatabaseError> {
        require_alert(self.db().conn(), id).await
    }

    /// Alerts matching `filter`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<OfferAlert>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref pid) = filter.project_id {
            params.push(libsql::Value::Text(pid.clone()));
            conditions.push(format!("project_id = ?{}", params.len()));
        }
        if let Some(ref oid) = filter.offer_id {
            params.push(libsql::Value::Text(oid.clone()));
            conditions.push(format!("offer_id = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(libsql::Value::Text(status.as_str().to_string()));
            conditions.push(format!("status = ?{}", params.len()));
        }
        if let Some(alert_type) = filter.alert_type {
            params.push(libsql::Value::Text(alert_type.as_str().to_string()));
            conditions.push(format!("type = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(u32::MAX);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM offer_alerts {where_clause} ORDER BY rowid LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut alerts = Vec::new();
        while let Some(row) = rows.next().await? {
            alerts.push(row_to_alert(&row)?);
        }
        Ok(alerts)
    }

    /// Open/resolved/ignored tallies of a project's alerts per offer or per estimate.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn alert_summary(
        &self,
        project_id: &str,
        group: SummaryGroup,
    ) -> Result<Vec<AlertSummary>, DatabaseError> {
        let group_col = match group {
            SummaryGroup::Offer => "a.offer_id",
            SummaryGroup::Estimate => "o.estimate_id",
        };
        let sql = format!(
            "SELECT {group_col},
                    SUM(a.status = 'open'), SUM(a.status = 'resolved'), SUM(a.status = 'ignored')
             FROM offer_alerts a JOIN offers o ON o.id = a.offer_id
             WHERE a.project_id = ?1
             GROUP BY {group_col} ORDER BY {group_col}"
        );
        let mut rows = self.db().conn().query(&sql, [project_id]).await?;
        let mut summary = Vec::new();
        while let Some(row) = rows.next().await? {
            summary.push(AlertSummary {
                group_id: row.get(0)?,
                open: get_u32(&row, 1)?,
                resolved: get_u32(&row, 2)?,
                ignored: get_u32(&row, 3)?,
            });
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{
        aggregated_line, detailed_line, test_baseline, test_offer, test_project, test_service,
    };
    use pretty_assertions::assert_eq;
    use tender_core::requests::ResolveAlertRequest;

    #[tokio::test]
    async fn filters_by_type_and_status() {
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
        svc.reconcile_offer(&offer.id, None).await.unwrap();

        let missing = svc
            .list_alerts(&AlertFilter {
                offer_id: Some(offer.id.clone()),
                alert_type: Some(AlertType::MissingBaseline),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|a| a.offer_item_id.is_none() && a.estimate_item_id.is_some()));

        let limited = svc
            .list_alerts(&AlertFilter {
                project_id: Some(project.id.clone()),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        assert!(svc
            .list_alerts(&AlertFilter {
                status: Some(AlertStatus::Ignored),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn summary_groups_by_offer_and_estimate() {
        let svc = test_service().await;
        let project = test_project(&svc).await;
        let estimate = test_baseline(&svc, &project).await;
        let acme = test_offer(&svc, &estimate, "ACME", vec![detailed_line(1, "A1", 10.0, 130.0)]).await;
        let beta = test_offer(&svc, &estimate, "Beta", vec![detailed_line(1, "A1", 10.0, 100.0)]).await;
        let acme_report = svc.reconcile_offer(&acme.id, None).await.unwrap();
        let beta_report = svc.reconcile_offer(&beta.id, None).await.unwrap();
        assert_eq!(acme_report.summary.alerts_created, 3);
        assert_eq!(beta_report.summary.alerts_created, 2);

        let price = svc
            .list_alerts(&AlertFilter {
                offer_id: Some(acme.id.clone()),
                alert_type: Some(AlertType::PriceMismatch),
                ..Default::default()
            })
            .await
            .unwrap();
        svc.resolve_alert(
            &price[0].id,
            &ResolveAlertRequest {
                status: Some(AlertStatus::Ignored),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let by_offer = svc.alert_summary(&project.id, SummaryGroup::Offer).await.unwrap();
        let mut expected = vec![
            AlertSummary {
                group_id: acme.id.clone(),
                open: 2,
                resolved: 0,
                ignored: 1,
            },
            AlertSummary {
                group_id: beta.id.clone(),
                open: 2,
                resolved: 0,
                ignored: 0,
            },
        ];
        expected.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        assert_eq!(by_offer, expected);

        let by_estimate = svc.alert_summary(&project.id, SummaryGroup::Estimate).await.unwrap();
        assert_eq!(
            by_estimate,
            vec![AlertSummary {
                group_id: estimate.id.clone(),
                open: 4,
                resolved: 0,
                ignored: 1,
            }]
        );
    }

    #[tokio::test]
    async fn unknown_alert_is_not_found() {
        let svc = test_service().await;
        assert!(matches!(
            svc.get_alert("alr-missing").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
