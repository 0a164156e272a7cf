//! Estimate line repository and typed line queries.

use chrono::Utc;
use tender_core::entities::{EstimateItem, WbsLevels};
use tender_core::filter::ItemFilter;
use tender_core::ids::PREFIX_ESTIMATE_ITEM;
use tender_core::requests::EstimateItemInput;
use tender_wbs::filter_by_node_id;

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, parse_datetime};
use crate::repos::estimate::require_estimate;
use crate::repos::wbs_node::wbs_node_exists;
use crate::service::TenderService;

const SELECT_COLS: &str = "id, project_id, estimate_id, price_list_item_id, progressive, code, \
     description, unit, quantity, unit_price, amount, \
     level_1, level_2, level_3, level_4, level_5, level_6, level_7, created_at";

fn row_to_estimate_item(row: &libsql::Row) -> Result<EstimateItem, DatabaseError> {
    Ok(EstimateItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        estimate_id: row.get(2)?,
        price_list_item_id: get_opt_string(row, 3)?,
        progressive: row.get::<Option<i64>>(4)?,
        code: get_opt_string(row, 5)?,
        description: get_opt_string(row, 6)?,
        unit: get_opt_string(row, 7)?,
        quantity: row.get(8)?,
        unit_price: row.get(9)?,
        amount: row.get(10)?,
        wbs: WbsLevels {
            level_1: get_opt_string(row, 11)?,
            level_2: get_opt_string(row, 12)?,
            level_3: get_opt_string(row, 13)?,
            level_4: get_opt_string(row, 14)?,
            level_5: get_opt_string(row, 15)?,
            level_6: get_opt_string(row, 16)?,
            level_7: get_opt_string(row, 17)?,
        },
        created_at: parse_datetime(&row.get::<String>(18)?)?,
    })
}

/// Insert one line; `amount` falls back to `quantity * unit_price`.
pub(crate) async fn insert_estimate_item(
    conn: &libsql::Connection,
    project_id: &str,
    estimate_id: &str,
    price_list_item_id: Option<&str>,
    input: &EstimateItemInput,
) -> Result<EstimateItem, DatabaseError> {
    let item = EstimateItem {
        id: generate_id(conn, PREFIX_ESTIMATE_ITEM).await?,
        project_id: project_id.to_string(),
        estimate_id: estimate_id.to_string(),
        price_list_item_id: price_list_item_id.map(String::from),
        progressive: input.progressive,
        code: input.code.clone(),
        description: input.description.clone(),
        unit: input.unit.clone(),
        quantity: input.quantity,
        unit_price: input.unit_price,
        amount: input.amount.unwrap_or(input.quantity * input.unit_price),
        wbs: input.wbs.clone(),
        created_at: Utc::now(),
    };
    let mut params: Vec<libsql::Value> = vec![
        item.id.clone().into(),
        item.project_id.clone().into(),
        item.estimate_id.clone().into(),
        item.price_list_item_id.clone().into(),
        item.progressive.into(),
        item.code.clone().into(),
        item.description.clone().into(),
        item.unit.clone().into(),
        item.quantity.into(),
        item.unit_price.into(),
        item.amount.into(),
    ];
    params.extend(item.wbs.to_vec().into_iter().map(libsql::Value::from));
    params.push(item.created_at.to_rfc3339().into());

    conn.execute(
        &format!(
            "INSERT INTO estimate_items ({SELECT_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        libsql::params_from_iter(params),
    )
    .await?;
    Ok(item)
}

/// Lines of one estimate in insertion order.
pub(crate) async fn fetch_estimate_items(
    conn: &libsql::Connection,
    estimate_id: &str,
) -> Result<Vec<EstimateItem>, DatabaseError> {
    query_items(
        conn,
        &format!("SELECT {SELECT_COLS} FROM estimate_items WHERE estimate_id = ?1 ORDER BY rowid"),
        estimate_id,
    )
    .await
}

async fn query_items(
    conn: &libsql::Connection,
    sql: &str,
    key: &str,
) -> Result<Vec<EstimateItem>, DatabaseError> {
    let mut rows = conn.query(sql, [key]).await?;
    let mut items = Vec::new();
    while let Some(row) = rows.next().await? {
        items.push(row_to_estimate_item(&row)?);
    }
    Ok(items)
}

impl TenderService {
    /// Baseline lines selected by a typed filter.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for empty ids and
    /// `DatabaseError::NotFound` for an unknown estimate or WBS node.
    pub async fn list_estimate_items(
        &self,
        filter: &ItemFilter,
    ) -> Result<Vec<EstimateItem>, DatabaseError> {
        filter.validate()?;
        let conn = self.db().conn();
        match filter {
            ItemFilter::Project { project_id } => {
                query_items(
                    conn,
                    &format!("SELECT {SELECT_COLS} FROM estimate_items WHERE project_id = ?1 ORDER BY rowid"),
                    project_id,
                )
                .await
            }
            ItemFilter::Estimate { estimate_id } => {
                require_estimate(conn, estimate_id).await?;
                fetch_estimate_items(conn, estimate_id).await
            }
            ItemFilter::WbsScope {
                estimate_id,
                node_id,
            } => {
                require_estimate(conn, estimate_id).await?;
                if !wbs_node_exists(conn, estimate_id, node_id).await? {
                    return Err(DatabaseError::not_found("wbs_node", node_id));
                }
                let items = fetch_estimate_items(conn, estimate_id).await?;
                Ok(filter_by_node_id(&items, Some(node_id))
                    .into_iter()
                    .cloned()
                    .collect())
            }
        }
    }
}
