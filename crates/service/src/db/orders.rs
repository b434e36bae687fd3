//! Order repository for database operations.
//!
//! Queries use the runtime-checked `sqlx::query` API with `FromRow` rows, so
//! the crate builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, instrument};

use order_service_core::{Delivery, Item, Order, OrderUid, Payment};

use super::{OrderReader, OrderWriter, RepositoryError};

const SELECT_ORDERS: &str = r"
    SELECT order_uid, track_number, entry, delivery, payment, locale,
           internal_signature, customer_id, delivery_service, shardkey,
           sm_id, date_created, oof_shard
    FROM orders
";

const SELECT_ITEMS: &str = r"
    SELECT order_uid, chrt_id, track_number, price, rid, name, sale, size,
           total_price, nm_id, brand, status
    FROM items
";

/// `orders` row. `items` are loaded separately.
#[derive(sqlx::FromRow)]
struct OrderRow {
    order_uid: OrderUid,
    track_number: String,
    entry: String,
    delivery: Json<Delivery>,
    payment: Json<Payment>,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i32,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

impl OrderRow {
    fn into_order(self, items: Vec<Item>) -> Order {
        Order {
            order_uid: self.order_uid,
            track_number: self.track_number,
            entry: self.entry,
            delivery: self.delivery.0,
            payment: self.payment.0,
            items,
            locale: self.locale,
            internal_signature: self.internal_signature,
            customer_id: self.customer_id,
            delivery_service: self.delivery_service,
            shardkey: self.shardkey,
            sm_id: self.sm_id,
            date_created: self.date_created,
            oof_shard: self.oof_shard,
        }
    }
}

/// `items` row.
#[derive(sqlx::FromRow)]
struct ItemRow {
    order_uid: OrderUid,
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i32,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i32,
}

impl ItemRow {
    fn into_pair(self) -> (OrderUid, Item) {
        (
            self.order_uid,
            Item {
                chrt_id: self.chrt_id,
                track_number: self.track_number,
                price: self.price,
                rid: self.rid,
                name: self.name,
                sale: self.sale,
                size: self.size,
                total_price: self.total_price,
                nm_id: self.nm_id,
                brand: self.brand,
                status: self.status,
            },
        )
    }
}

/// Repository for order database operations.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl OrderWriter for PgOrderRepository {
    #[instrument(skip(self, order), fields(order_uid = %order.order_uid, items = order.items.len()))]
    async fn insert_order_and_items(&self, order: &Order) -> Result<(), RepositoryError> {
        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO orders (order_uid, track_number, entry, delivery, payment, locale,
                                internal_signature, customer_id, delivery_service, shardkey,
                                sm_id, date_created, oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(Json(&order.delivery))
        .bind(Json(&order.payment))
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, &order.order_uid))?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, sale,
                                   size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Order committed");

        Ok(())
    }
}

impl OrderReader for PgOrderRepository {
    #[instrument(skip(self))]
    async fn scan_all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDERS} ORDER BY order_uid"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_order(Vec::new()))
            .collect())
    }

    #[instrument(skip(self))]
    async fn scan_all_items(&self) -> Result<Vec<(OrderUid, Item)>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!("{SELECT_ITEMS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ItemRow::into_pair).collect())
    }

    #[instrument(skip(self), fields(order_uid = %uid))]
    async fn scan_order_by_id(&self, uid: &OrderUid) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("{SELECT_ORDERS} WHERE order_uid = $1"))
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<ItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEMS} WHERE order_uid = $1 ORDER BY id"))
                .bind(uid)
                .fetch_all(&self.pool)
                .await?;

        let items = items.into_iter().map(|row| row.into_pair().1).collect();
        Ok(Some(row.into_order(items)))
    }
}

fn map_insert_error(e: sqlx::Error, uid: &OrderUid) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("order {uid} already exists"));
    }
    RepositoryError::Database(e)
}
