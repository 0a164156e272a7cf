//! Price-list item repository.
//!
//! Catalog rows are written by import and merge only; the matcher reads them.

use chrono::Utc;
use tender_core::entities::PriceListItem;
use tender_core::ids::PREFIX_PRICE_LIST_ITEM;
use tender_core::requests::PriceListItemInput;

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, parse_datetime};
use crate::service::TenderService;

const SELECT_COLS: &str = "id, project_id, estimate_id, code, description, unit, price, created_at";

fn row_to_price_list_item(row: &libsql::Row) -> Result<PriceListItem, DatabaseError> {
    Ok(PriceListItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        estimate_id: row.get(2)?,
        code: row.get(3)?,
        description: row.get(4)?,
        unit: get_opt_string(row, 5)?,
        price: row.get(6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

pub(crate) async fn insert_price_list_item(
    conn: &libsql::Connection,
    project_id: &str,
    estimate_id: &str,
    input: &PriceListItemInput,
) -> Result<PriceListItem, DatabaseError> {
    let item = PriceListItem {
        id: generate_id(conn, PREFIX_PRICE_LIST_ITEM).await?,
        project_id: project_id.to_string(),
        estimate_id: estimate_id.to_string(),
        code: input.code.clone(),
        description: input.description.clone(),
        unit: input.unit.clone(),
        price: input.price,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO price_list_items (id, project_id, estimate_id, code, description, unit, price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        libsql::params![
            item.id.as_str(),
            item.project_id.as_str(),
            item.estimate_id.as_str(),
            item.code.as_str(),
            item.description.as_str(),
            item.unit.as_deref(),
            item.price,
            item.created_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(item)
}

/// Catalog of one estimate in insertion order.
pub(crate) async fn fetch_price_list(
    conn: &libsql::Connection,
    estimate_id: &str,
) -> Result<Vec<PriceListItem>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM price_list_items WHERE estimate_id = ?1 ORDER BY rowid"),
            [estimate_id],
        )
        .await?;
    let mut items = Vec::new();
    while let Some(row) = rows.next().await? {
        items.push(row_to_price_list_item(&row)?);
    }
    Ok(items)
}

pub(crate) async fn fetch_price_list_item(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<PriceListItem>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM price_list_items WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_price_list_item(&row)?)),
        None => Ok(None),
    }
}

impl TenderService {
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown estimate.
    pub async fn list_price_list(&self, estimate_id: &str) -> Result<Vec<PriceListItem>, DatabaseError> {
        let conn = self.db().conn();
        crate::repos::estimate::require_estimate(conn, estimate_id).await?;
        fetch_price_list(conn, estimate_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::{test_baseline, test_project, test_service};

    #[tokio::test]
    async fn catalog_keeps_import_order() {
        let svc = test_service().await;
        let project = test_project(&svc).await;
        let estimate = test_baseline(&svc, &project).await;

        let catalog = svc.list_price_list(&estimate.id).await.unwrap();
        let codes: Vec<&str> = catalog.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["A1", "B1", "C1"]);
        assert!(catalog.iter().all(|p| p.estimate_id == estimate.id && p.project_id == project.id));
    }

    #[tokio::test]
    async fn unknown_estimate_is_not_found() {
        let svc = test_service().await;
        assert!(svc.list_price_list("est-missing").await.is_err());
    }
}
