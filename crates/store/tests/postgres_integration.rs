//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{OrderLineItem, OrderRecord};
use sqlx::PgPool;
use store::{
    InventoryStore, ItemId, OrderId, OrderStore, PostgresInventoryStore, PostgresOrderStore,
    StockRecord, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            store::run_migrations(&temp_pool).await.unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh pool per test with cleared tables.
async fn get_test_stores() -> (PostgresInventoryStore, PostgresOrderStore) {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE stock_items, orders")
        .execute(&pool)
        .await
        .unwrap();

    (
        PostgresInventoryStore::new(pool.clone()),
        PostgresOrderStore::new(pool),
    )
}

#[tokio::test]
async fn put_and_get_stock() {
    let (inventory, _) = get_test_stores().await;

    inventory
        .put_stock(StockRecord::new("sku-1", 5))
        .await
        .unwrap();

    let stock = inventory.get_stock(&ItemId::new("sku-1")).await.unwrap();
    assert_eq!(stock, Some(5));

    let missing = inventory.get_stock(&ItemId::new("sku-404")).await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn put_stock_replaces_existing_record() {
    let (inventory, _) = get_test_stores().await;

    inventory.put_stock(StockRecord::new("sku-1", 5)).await.unwrap();
    inventory.put_stock(StockRecord::new("sku-1", 8)).await.unwrap();

    let stock = inventory.get_stock(&ItemId::new("sku-1")).await.unwrap();
    assert_eq!(stock, Some(8));
}

#[tokio::test]
async fn null_stock_reads_as_missing() {
    let (inventory, _) = get_test_stores().await;

    sqlx::query("INSERT INTO stock_items (item_id, stock) VALUES ('sku-null', NULL)")
        .execute(inventory.pool())
        .await
        .unwrap();

    let item = ItemId::new("sku-null");
    assert_eq!(inventory.get_stock(&item).await.unwrap(), None);
    assert!(matches!(
        inventory.decrement_stock(&item, 1).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn decrement_is_conditional() {
    let (inventory, _) = get_test_stores().await;
    let item = ItemId::new("sku-1");
    inventory.put_stock(StockRecord::new("sku-1", 5)).await.unwrap();

    let remaining = inventory.decrement_stock(&item, 3).await.unwrap();
    assert_eq!(remaining, 2);

    let err = inventory.decrement_stock(&item, 3).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        }
    ));
    assert_eq!(inventory.get_stock(&item).await.unwrap(), Some(2));

    let missing = inventory
        .decrement_stock(&ItemId::new("sku-404"), 1)
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_decrements_never_oversell() {
    let (inventory, _) = get_test_stores().await;
    inventory.put_stock(StockRecord::new("sku-1", 3)).await.unwrap();

    let attempts = (0..8).map(|_| {
        let inventory = inventory.clone();
        async move { inventory.decrement_stock(&ItemId::new("sku-1"), 1).await }
    });
    let results = futures_util::future::join_all(attempts).await;

    let applied = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(applied, 3);
    assert_eq!(
        inventory.get_stock(&ItemId::new("sku-1")).await.unwrap(),
        Some(0)
    );
}

#[tokio::test]
async fn put_and_get_order() {
    let (_, orders) = get_test_stores().await;
    let record = OrderRecord::new(
        OrderId::new(),
        vec![
            OrderLineItem::new("sku-1", 3),
            OrderLineItem::new("sku-2", 1),
        ],
    );

    orders.put_order(&record).await.unwrap();

    let loaded = orders.get_order(record.order_id).await.unwrap().unwrap();
    assert_eq!(loaded.order_id, record.order_id);
    assert_eq!(loaded.line_items, record.line_items);

    assert!(orders.get_order(OrderId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn orders_are_write_once() {
    let (_, orders) = get_test_stores().await;
    let record = OrderRecord::new(OrderId::new(), vec![OrderLineItem::new("sku-1", 1)]);

    orders.put_order(&record).await.unwrap();
    let err = orders.put_order(&record).await.unwrap_err();

    assert!(matches!(err, StoreError::DuplicateOrder(id) if id == record.order_id));
}
