//! Offer repository.

use chrono::Utc;
use tender_core::entities::Offer;
use tender_core::enums::{AuditAction, EntityType};
use tender_core::ids::PREFIX_OFFER;

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_u32, parse_datetime};
use crate::repos::audit::append_audit;
use crate::service::TenderService;

const SELECT_COLS: &str = "id, project_id, estimate_id, company, round, created_at";

fn row_to_offer(row: &libsql::Row) -> Result<Offer, DatabaseError> {
    Ok(Offer {
        id: row.get(0)?,
        project_id: row.get(1)?,
        estimate_id: row.get(2)?,
        company: row.get(3)?,
        round: get_u32(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

pub(crate) async fn insert_offer(
    conn: &libsql::Connection,
    project_id: &str,
    estimate_id: &str,
    company: &str,
    round: u32,
) -> Result<Offer, DatabaseError> {
    let offer = Offer {
        id: generate_id(conn, PREFIX_OFFER).await?,
        project_id: project_id.to_string(),
        estimate_id: estimate_id.to_string(),
        company: company.to_string(),
        round,
        created_at: Utc::now(),
    };
    conn.execute(
        &format!("INSERT INTO offers ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        libsql::params![
            offer.id.as_str(),
            offer.project_id.as_str(),
            offer.estimate_id.as_str(),
            offer.company.as_str(),
            round,
            offer.created_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(offer)
}

pub(crate) async fn fetch_offer(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Offer>, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM offers WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_offer(&row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn require_offer(conn: &libsql::Connection, id: &str) -> Result<Offer, DatabaseError> {
    fetch_offer(conn, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("offer", id))
}

/// Offer already submitted by `company` for `round` against an estimate.
pub(crate) async fn find_offer(
    conn: &libsql::Connection,
    estimate_id: &str,
    company: &str,
    round: u32,
) -> Result<Option<Offer>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM offers WHERE estimate_id = ?1 AND company = ?2 AND round = ?3"
            ),
            libsql::params![estimate_id, company, round],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_offer(&row)?)),
        None => Ok(None),
    }
}

impl TenderService {
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn get_offer(&self, id: &str) -> Result<Offer, DatabaseError> {
        require_offer(self.db().conn(), id).await
    }

    /// Offers against an estimate, by company then round.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_offers(&self, estimate_id: &str) -> Result<Vec<Offer>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM offers WHERE estimate_id = ?1 ORDER BY company, round"
                ),
                [estimate_id],
            )
            .await?;
        let mut offers = Vec::new();
        while let Some(row) = rows.next().await? {
            offers.push(row_to_offer(&row)?);
        }
        Ok(offers)
    }

    /// Delete an offer with its lines and alerts.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn delete_offer(&self, id: &str) -> Result<(), DatabaseError> {
        let wtx = self.begin().await?;
        let result: Result<(), DatabaseError> = async {
            let offer = require_offer(&wtx.tx, id).await?;
            wtx.tx.execute("DELETE FROM offers WHERE id = ?1", [id]).await?;
            append_audit(
                &wtx.tx,
                EntityType::Offer,
                id,
                AuditAction::Deleted,
                Some(serde_json::json!({
                    "estimate_id": offer.estimate_id,
                    "company": offer.company,
                    "round": offer.round,
                })),
            )
            .await?;
            Ok(())
        }
        .await;
        wtx.finish("delete_offer", result).await?;
        tracing::info!(offer = id, "offer deleted");
        Ok(())
    }
}
