//! WBS node repository.
//!
//! Node rows are derived data: import and merge write them from the line set,
//! `rebuild_wbs` regenerates them on demand.

use tender_core::entities::{WbsLevels, WbsNodeRecord};
use tender_core::enums::{AuditAction, EntityType};
use tender_core::ids::PREFIX_WBS_NODE;
use tender_wbs::{WbsAssembly, WbsNode, WbsRecord, build_tree};

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, get_u32};
use crate::repos::audit::append_audit;
use crate::repos::estimate::require_estimate;
use crate::repos::estimate_item::fetch_estimate_items;
use crate::service::TenderService;

const SELECT_COLS: &str = "id, estimate_id, path, code, name, level, parent_path, position";

fn row_to_wbs_node(row: &libsql::Row) -> Result<WbsNodeRecord, DatabaseError> {
    let level = row.get::<i64>(5)?;
    Ok(WbsNodeRecord {
        id: row.get(0)?,
        estimate_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        name: row.get(4)?,
        level: u8::try_from(level)
            .ok()
            .filter(|l| (1..=WbsLevels::MAX_LEVEL).contains(l))
            .ok_or_else(|| DatabaseError::InvalidState(format!("wbs level {level} out of range")))?,
        parent_path: get_opt_string(row, 6)?,
        position: get_u32(row, 7)?,
    })
}

/// Replace the node rows of an estimate. Returns the number written.
pub(crate) async fn replace_wbs_nodes(
    conn: &libsql::Connection,
    estimate_id: &str,
    records: &[WbsRecord],
) -> Result<u32, DatabaseError> {
    conn.execute("DELETE FROM wbs_nodes WHERE estimate_id = ?1", [estimate_id])
        .await?;
    let mut written = 0u32;
    for record in records {
        let id = generate_id(conn, PREFIX_WBS_NODE).await?;
        conn.execute(
            &format!("INSERT INTO wbs_nodes ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            libsql::params![
                id.as_str(),
                estimate_id,
                record.path.as_str(),
                record.code.as_str(),
                record.name.as_str(),
                i64::from(record.level),
                record.parent_path.as_deref(),
                i64::from(record.position)
            ],
        )
        .await?;
        written += 1;
    }
    Ok(written)
}

/// Rebuild node rows from the estimate's current lines.
pub(crate) async fn rebuild_wbs_nodes(
    conn: &libsql::Connection,
    estimate_id: &str,
) -> Result<u32, DatabaseError> {
    let items = fetch_estimate_items(conn, estimate_id).await?;
    let assembly = WbsAssembly::from_items(&items);
    replace_wbs_nodes(conn, estimate_id, &assembly.records()).await
}

pub(crate) async fn wbs_node_exists(
    conn: &libsql::Connection,
    estimate_id: &str,
    path: &str,
) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM wbs_nodes WHERE estimate_id = ?1 AND path = ?2",
            [estimate_id, path],
        )
        .await?;
    Ok(rows.next().await?.is_some())
}

impl TenderService {
    /// Persisted node rows in tree preorder.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown estimate.
    pub async fn list_wbs_nodes(&self, estimate_id: &str) -> Result<Vec<WbsNodeRecord>, DatabaseError> {
        let conn = self.db().conn();
        require_estimate(conn, estimate_id).await?;
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM wbs_nodes WHERE estimate_id = ?1 ORDER BY rowid"),
                [estimate_id],
            )
            .await?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_wbs_node(&row)?);
        }
        Ok(nodes)
    }

    /// WBS tree assembled from the estimate's lines.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown estimate.
    pub async fn wbs_tree(&self, estimate_id: &str) -> Result<Vec<WbsNode>, DatabaseError> {
        let conn = self.db().conn();
        require_estimate(conn, estimate_id).await?;
        let items = fetch_estimate_items(conn, estimate_id).await?;
        Ok(build_tree(&items))
    }

    /// Regenerate the node rows of an estimate. Returns the node count.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown estimate.
    pub async fn rebuild_wbs(&self, estimate_id: &str) -> Result<u32, DatabaseError> {
        let wtx = self.begin().await?;
        let result: Result<u32, DatabaseError> = async {
            require_estimate(&wtx.tx, estimate_id).await?;
            let written = rebuild_wbs_nodes(&wtx.tx, estimate_id).await?;
            append_audit(
                &wtx.tx,
                EntityType::Estimate,
                estimate_id,
                AuditAction::Updated,
                Some(serde_json::json!({ "wbs_nodes": written })),
            )
            .await?;
            Ok(written)
        }
        .await;
        let written = wtx.finish("rebuild_wbs", result).await?;
        tracing::info!(estimate = estimate_id, nodes = written, "wbs nodes rebuilt");
        Ok(written)
    }
}
