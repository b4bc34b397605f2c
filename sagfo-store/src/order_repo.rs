use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sagfo_catalog::Equipment;
use sagfo_core::repository::{OrderFilter, OrderPatch, OrderRepository, RepoResult};
use sagfo_core::RepositoryError;
use sagfo_order::{
    CustomerInfo, Customization, Financials, Order, OrderItem, ProductionDetails, StatusHistoryEntry,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::{corrupt, db_error};

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    payment_method: String,
    financials: Json<Financials>,
    status_history: Json<Vec<StatusHistoryEntry>>,
    assigned_transporter_id: Option<Uuid>,
    customer_info: Json<CustomerInfo>,
    production_details: Option<Json<ProductionDetails>>,
    payment_proof_url: Option<String>,
    created_at: DateTime<Utc>,
    version: i64,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    #[allow(dead_code)]
    line_no: i32,
    equipment_snapshot: Json<Equipment>,
    quantity: i32,
    price_at_purchase: i64,
    customization: Json<Customization>,
    delivery_status: String,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            equipment: row.equipment_snapshot.0,
            quantity: u32::try_from(row.quantity).map_err(|e| corrupt("order item", e))?,
            price_at_purchase: row.price_at_purchase,
            customization: row.customization.0,
            delivery_status: row.delivery_status.parse().map_err(|e| corrupt("order item", e))?,
        })
    }
}

fn assemble(row: OrderRow, items: Vec<OrderItem>) -> RepoResult<Order> {
    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        status: row.status.parse().map_err(|e| corrupt("order", e))?,
        payment_method: row.payment_method.parse().map_err(|e| corrupt("order", e))?,
        financials: row.financials.0,
        items,
        status_history: row.status_history.0,
        assigned_transporter_id: row.assigned_transporter_id,
        customer_info: row.customer_info.0,
        production_details: row.production_details.map(|d| d.0),
        payment_proof_url: row.payment_proof_url,
        created_at: row.created_at,
        version: row.version,
    })
}

const SELECT_ORDER: &str = r#"
    SELECT id, user_id, status, payment_method, financials, status_history, assigned_transporter_id,
           customer_info, production_details, payment_proof_url, created_at, version
    FROM orders
"#;

const SELECT_ITEMS: &str = r#"
    SELECT order_id, line_no, equipment_snapshot, quantity, price_at_purchase, customization, delivery_status
    FROM order_items
"#;

async fn fetch_order(conn: &mut PgConnection, id: Uuid) -> RepoResult<Option<Order>> {
    let sql = format!("{SELECT_ORDER} WHERE id = $1");
    let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?
    else {
        return Ok(None);
    };

    let sql = format!("{SELECT_ITEMS} WHERE order_id = $1 ORDER BY line_no");
    let items = sqlx::query_as::<_, OrderItemRow>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<RepoResult<Vec<_>>>()?;

    assemble(row, items).map(Some)
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, payment_method, financials, status_history,
                                assigned_transporter_id, customer_info, production_details,
                                payment_proof_url, created_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status.label())
        .bind(order.payment_method.as_str())
        .bind(Json(&order.financials))
        .bind(Json(&order.status_history))
        .bind(order.assigned_transporter_id)
        .bind(Json(&order.customer_info))
        .bind(order.production_details.as_ref().map(Json))
        .bind(&order.payment_proof_url)
        .bind(order.created_at)
        .bind(order.version)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for (line_no, item) in order.items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| RepositoryError::Backend(format!("quantity {} out of range", item.quantity)))?;
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, equipment_id, equipment_snapshot, quantity,
                                         price_at_purchase, customization, delivery_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order.id)
            .bind(line_no as i32)
            .bind(item.equipment.id)
            .bind(Json(&item.equipment))
            .bind(quantity)
            .bind(item.price_at_purchase)
            .bind(Json(&item.customization))
            .bind(item.delivery_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(order_id = %order.id, items = order.items.len(), "Order inserted");
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        fetch_order(&mut *conn, id).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let sql = format!(
            "{SELECT_ORDER} WHERE ($1::uuid IS NULL OR user_id = $1) \
             AND ($2::uuid IS NULL OR assigned_transporter_id = $2) \
             AND ($3::text IS NULL OR status = $3) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.user_id)
            .bind(filter.assigned_transporter_id)
            .bind(filter.status.map(|s| s.label()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let sql = format!("{SELECT_ITEMS} WHERE order_id = ANY($1) ORDER BY order_id, line_no");
        let item_rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items.entry(order_id).or_default().push(OrderItem::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                assemble(row, lines)
            })
            .collect()
    }

    /// One transaction: the version-guarded order row update plus every
    /// line's delivery status.
    async fn update_order(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &OrderPatch,
    ) -> RepoResult<Order> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, status_history = $4, assigned_transporter_id = $5, version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(patch.status.label())
        .bind(Json(&patch.status_history))
        .bind(patch.assigned_transporter_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
            return Err(match exists {
                None => RepositoryError::NotFound(format!("order {id}")),
                Some(found) => RepositoryError::Conflict(format!(
                    "order {id} was modified concurrently (expected version {expected_version}, found {found})"
                )),
            });
        }

        for (line_no, status) in patch.item_delivery.iter().enumerate() {
            sqlx::query(
                "UPDATE order_items SET delivery_status = $3 WHERE order_id = $1 AND line_no = $2 AND delivery_status <> $3",
            )
            .bind(id)
            .bind(line_no as i32)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let stored = fetch_order(&mut *tx, id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))?;
        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }
}
