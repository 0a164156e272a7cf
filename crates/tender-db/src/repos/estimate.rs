//! Estimate repository.

use chrono::Utc;
use tender_core::entities::Estimate;
use tender_core::enums::{AuditAction, EntityType};
use tender_core::ids::PREFIX_ESTIMATE;

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, parse_datetime};
use crate::repos::audit::append_audit;
use crate::service::TenderService;

const SELECT_COLS: &str =
    "id, project_id, name, is_baseline, price_list_name, created_at, updated_at";

fn row_to_estimate(row: &libsql::Row) -> Result<Estimate, DatabaseError> {
    Ok(Estimate {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        is_baseline: row.get::<i64>(3)? != 0,
        price_list_name: get_opt_string(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

pub(crate) async fn insert_estimate(
    conn: &libsql::Connection,
    project_id: &str,
    name: &str,
    is_baseline: bool,
    price_list_name: Option<&str>,
) -> Result<Estimate, DatabaseError> {
    let now = Utc::now();
    let estimate = Estimate {
        id: generate_id(conn, PREFIX_ESTIMATE).await?,
        project_id: project_id.to_string(),
        name: name.to_string(),
        is_baseline,
        price_list_name: price_list_name.map(String::from),
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO estimates (id, project_id, name, is_baseline, price_list_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        libsql::params![
            estimate.id.as_str(),
            estimate.project_id.as_str(),
            estimate.name.as_str(),
            i64::from(is_baseline),
            estimate.price_list_name.as_deref(),
            now.to_rfc3339(),
            now.to_rfc3339()
        ],
    )
    .await?;
    Ok(estimate)
}

/// Drop the baseline flag from every estimate of the project.
pub(crate) async fn clear_baseline(
    conn: &libsql::Connection,
    project_id: &str,
) -> Result<u64, DatabaseError> {
    let cleared = conn
        .execute(
            "UPDATE estimates SET is_baseline = 0, updated_at = ?2
             WHERE project_id = ?1 AND is_baseline = 1",
            libsql::params![project_id, Utc::now().to_rfc3339()],
        )
        .await?;
    Ok(cleared)
}

pub(crate) async fn fetch_estimate(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Estimate>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM estimates WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_estimate(&row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn require_estimate(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Estimate, DatabaseError> {
    fetch_estimate(conn, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("estimate", id))
}

impl TenderService {
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn get_estimate(&self, id: &str) -> Result<Estimate, DatabaseError> {
        require_estimate(self.db().conn(), id).await
    }

    /// Estimates of a project, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_estimates(&self, project_id: &str) -> Result<Vec<Estimate>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM estimates WHERE project_id = ?1 ORDER BY rowid"),
                [project_id],
            )
            .await?;
        let mut estimates = Vec::new();
        while let Some(row) = rows.next().await? {
            estimates.push(row_to_estimate(&row)?);
        }
        Ok(estimates)
    }

    /// The project's baseline estimate, if one is flagged.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn baseline_estimate(&self, project_id: &str) -> Result<Option<Estimate>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM estimates WHERE project_id = ?1 AND is_baseline = 1"
                ),
                [project_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_estimate(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete an estimate with its catalog, lines, WBS nodes and the offers
    /// made against it (offer lines and alerts included).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn delete_estimate(&self, id: &str) -> Result<(), DatabaseError> {
        let wtx = self.begin().await?;
        let result: Result<(), DatabaseError> = async {
            let estimate = require_estimate(&wtx.tx, id).await?;
            wtx.tx
                .execute("DELETE FROM estimates WHERE id = ?1", [id])
                .await?;
            append_audit(
                &wtx.tx,
                EntityType::Estimate,
                id,
                AuditAction::Deleted,
                Some(serde_json::json!({ "project_id": estimate.project_id, "name": estimate.name })),
            )
            .await?;
            Ok(())
        }
        .await;
        wtx.finish("delete_estimate", result).await?;
        tracing::info!(estimate = id, "estimate deleted");
        Ok(())
    }
}
