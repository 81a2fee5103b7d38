use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, OrderLineItem, OrderRecord, StockRecord};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{InventoryStore, OrderStore, Result, StoreError};

/// Runs the database migrations for both stores.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn get_stock(&self, item_id: &ItemId) -> Result<Option<u64>> {
        let stock: Option<Option<i64>> =
            sqlx::query_scalar("SELECT stock FROM stock_items WHERE item_id = $1")
                .bind(item_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        // A NULL or negative count is not a usable stock level.
        Ok(stock.flatten().and_then(|s| u64::try_from(s).ok()))
    }

    async fn decrement_stock(&self, item_id: &ItemId, quantity: u32) -> Result<u64> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock_items
            SET stock = stock - $2
            WHERE item_id = $1 AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(item_id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            tracing::debug!(%item_id, quantity, remaining, "stock decremented");
            return Ok(u64::try_from(remaining).unwrap_or_default());
        }

        // Nothing matched: tell a short item apart from a missing one.
        match self.get_stock(item_id).await? {
            Some(available) => Err(StoreError::InsufficientStock {
                item_id: item_id.clone(),
                requested: quantity,
                available,
            }),
            None => Err(StoreError::NotFound(item_id.clone())),
        }
    }

    async fn put_stock(&self, record: StockRecord) -> Result<()> {
        let stock = i64::try_from(record.stock).map_err(|_| {
            StoreError::InvalidRecord(format!(
                "stock {} for {} exceeds the storable range",
                record.stock, record.item_id
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO stock_items (item_id, stock)
            VALUES ($1, $2)
            ON CONFLICT (item_id) DO UPDATE SET stock = EXCLUDED.stock
            "#,
        )
        .bind(record.item_id.as_str())
        .bind(stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        let line_items: serde_json::Value = row.try_get("line_items")?;
        let line_items: Vec<OrderLineItem> = serde_json::from_value(line_items)?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(OrderRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            line_items,
            created_at,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn put_order(&self, record: &OrderRecord) -> Result<()> {
        let line_items = serde_json::to_value(&record.line_items)?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (order_id, line_items, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(record.order_id.as_uuid())
        .bind(line_items)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateOrder(record.order_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            "SELECT order_id, line_items, created_at FROM orders WHERE order_id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }
}
