//! Offer line repository.

use chrono::Utc;
use tender_core::entities::OfferItem;
use tender_recon::ItemLink;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_id_list};
use crate::repos::offer::require_offer;
use crate::service::TenderService;

const SELECT_COLS: &str = "id, offer_id, project_id, origin, source, resolution_status, \
     candidate_price_list_item_ids, price_list_item_id, estimate_item_id, progressive, code, \
     description, unit, quantity, unit_price, amount, created_at, updated_at";

fn row_to_offer_item(row: &libsql::Row) -> Result<OfferItem, DatabaseError> {
    Ok(OfferItem {
        id: row.get(0)?,
        offer_id: row.get(1)?,
        project_id: row.get(2)?,
        origin: parse_enum(&row.get::<String>(3)?)?,
        source: parse_enum(&row.get::<String>(4)?)?,
        resolution_status: parse_enum(&row.get::<String>(5)?)?,
        candidate_price_list_item_ids: parse_id_list(&row.get::<String>(6)?)?,
        price_list_item_id: get_opt_string(row, 7)?,
        estimate_item_id: get_opt_string(row, 8)?,
        progressive: row.get::<Option<i64>>(9)?,
        code: get_opt_string(row, 10)?,
        description: get_opt_string(row, 11)?,
        unit: get_opt_string(row, 12)?,
        quantity: row.get(13)?,
        unit_price: row.get(14)?,
        amount: row.get::<Option<f64>>(15)?,
        created_at: parse_datetime(&row.get::<String>(16)?)?,
        updated_at: parse_datetime(&row.get::<String>(17)?)?,
    })
}

pub(crate) async fn insert_offer_item(
    conn: &libsql::Connection,
    item: &OfferItem,
) -> Result<(), DatabaseError> {
    let params: Vec<libsql::Value> = vec![
        item.id.clone().into(),
        item.offer_id.clone().into(),
        item.project_id.clone().into(),
        item.origin.as_str().into(),
        item.source.as_str().into(),
        item.resolution_status.as_str().into(),
        serde_json::to_string(&item.candidate_price_list_item_ids)?.into(),
        item.price_list_item_id.clone().into(),
        item.estimate_item_id.clone().into(),
        item.progressive.into(),
        item.code.clone().into(),
        item.description.clone().into(),
        item.unit.clone().into(),
        item.quantity.into(),
        item.unit_price.into(),
        item.amount.into(),
        item.created_at.to_rfc3339().into(),
        item.updated_at.to_rfc3339().into(),
    ];
    conn.execute(
        &format!(
            "INSERT INTO offer_items ({SELECT_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        libsql::params_from_iter(params),
    )
    .await?;
    Ok(())
}

/// Lines of one offer in insertion order.
pub(crate) async fn fetch_offer_items(
    conn: &libsql::Connection,
    offer_id: &str,
) -> Result<Vec<OfferItem>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM offer_items WHERE offer_id = ?1 ORDER BY rowid"),
            [offer_id],
        )
        .await?;
    let mut items = Vec::new();
    while let Some(row) = rows.next().await? {
        items.push(row_to_offer_item(&row)?);
    }
    Ok(items)
}

pub(crate) async fn require_offer_item(
    conn: &libsql::Connection,
    id: &str,
) -> Result<OfferItem, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM offer_items WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => row_to_offer_item(&row),
        None => Err(DatabaseError::not_found("offer_item", id)),
    }
}

/// Write the price-list linkage computed by a reconciliation pass.
pub(crate) async fn apply_link(conn: &libsql::Connection, link: &ItemLink) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE offer_items
         SET price_list_item_id = ?2, candidate_price_list_item_ids = ?3,
             resolution_status = ?4, updated_at = ?5
         WHERE id = ?1",
        libsql::params![
            link.offer_item_id.as_str(),
            link.price_list_item_id.as_deref(),
            serde_json::to_string(&link.candidate_price_list_item_ids)?,
            link.resolution_status.as_str(),
            Utc::now().to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

impl TenderService {
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn get_offer_item(&self, id: &str) -> Result<OfferItem, DatabaseError> {
        require_offer_item(self.db().conn(), id).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown offer.
    pub async fn list_offer_items(&self, offer_id: &str) -> Result<Vec<OfferItem>, DatabaseError> {
        let conn = self.db().conn();
        require_offer(conn, offer_id).await?;
        fetch_offer_items(conn, offer_id).await
    }
}
