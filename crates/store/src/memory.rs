use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{ItemId, OrderId, OrderRecord, StockRecord};
use tokio::sync::RwLock;

use crate::{InventoryStore, OrderStore, Result, StoreError};

#[derive(Debug, Default)]
struct InventoryFaults {
    failing_reads: HashSet<ItemId>,
    failing_decrements: HashSet<ItemId>,
    read_latency: Option<Duration>,
    decrement_latency: Option<Duration>,
}

/// In-memory inventory store.
///
/// Stock entries are `None` when the record exists but its stock cannot be
/// read, which mirrors a malformed row in a real store. Faults (per-item
/// failures, latency) can be injected for tests.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    stock: Arc<RwLock<HashMap<ItemId, Option<u64>>>>,
    faults: Arc<RwLock<InventoryFaults>>,
    reads: Arc<AtomicUsize>,
    decrements: Arc<AtomicUsize>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given stock levels.
    pub fn with_stock<I, K>(levels: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<ItemId>,
    {
        let stock = levels
            .into_iter()
            .map(|(item_id, stock)| (item_id.into(), Some(stock)))
            .collect();
        Self {
            stock: Arc::new(RwLock::new(stock)),
            ..Self::default()
        }
    }

    /// Returns the stock held for an item, if it has a readable record.
    pub async fn stock_of(&self, item_id: &str) -> Option<u64> {
        self.stock
            .read()
            .await
            .get(&ItemId::new(item_id))
            .copied()
            .flatten()
    }

    /// Returns every readable stock level.
    pub async fn snapshot(&self) -> HashMap<ItemId, u64> {
        self.stock
            .read()
            .await
            .iter()
            .filter_map(|(id, stock)| stock.map(|s| (id.clone(), s)))
            .collect()
    }

    /// Inserts a record whose stock field cannot be read.
    pub async fn insert_malformed(&self, item_id: impl Into<ItemId>) {
        self.stock.write().await.insert(item_id.into(), None);
    }

    /// Makes every `get_stock` call for the item fail as unavailable.
    pub async fn fail_reads_for(&self, item_id: impl Into<ItemId>) {
        self.faults.write().await.failing_reads.insert(item_id.into());
    }

    /// Makes every `decrement_stock` call for the item fail as unavailable.
    pub async fn fail_decrements_for(&self, item_id: impl Into<ItemId>) {
        self.faults
            .write()
            .await
            .failing_decrements
            .insert(item_id.into());
    }

    /// Delays every `get_stock` call.
    pub async fn set_read_latency(&self, latency: Duration) {
        self.faults.write().await.read_latency = Some(latency);
    }

    /// Delays every `decrement_stock` call before the stock is touched.
    pub async fn set_decrement_latency(&self, latency: Duration) {
        self.faults.write().await.decrement_latency = Some(latency);
    }

    /// Number of `get_stock` calls received.
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `decrement_stock` calls received.
    pub fn decrement_calls(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_stock(&self, item_id: &ItemId) -> Result<Option<u64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let (failing, latency) = {
            let faults = self.faults.read().await;
            (faults.failing_reads.contains(item_id), faults.read_latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(StoreError::Unavailable(format!(
                "read of {item_id} failed"
            )));
        }

        Ok(self.stock.read().await.get(item_id).copied().flatten())
    }

    async fn decrement_stock(&self, item_id: &ItemId, quantity: u32) -> Result<u64> {
        self.decrements.fetch_add(1, Ordering::SeqCst);

        let (failing, latency) = {
            let faults = self.faults.read().await;
            (
                faults.failing_decrements.contains(item_id),
                faults.decrement_latency,
            )
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(StoreError::Unavailable(format!(
                "decrement of {item_id} failed"
            )));
        }

        let mut stock = self.stock.write().await;
        let Some(current) = stock.get_mut(item_id).and_then(Option::as_mut) else {
            return Err(StoreError::NotFound(item_id.clone()));
        };

        let requested = u64::from(quantity);
        if *current < requested {
            return Err(StoreError::InsufficientStock {
                item_id: item_id.clone(),
                requested: quantity,
                available: *current,
            });
        }

        *current -= requested;
        Ok(*current)
    }

    async fn put_stock(&self, record: StockRecord) -> Result<()> {
        self.stock
            .write()
            .await
            .insert(record.item_id, Some(record.stock));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OrderFaults {
    fail_on_put: bool,
    put_latency: Option<Duration>,
}

/// In-memory append-only order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<OrderRecord>>>,
    faults: Arc<RwLock<OrderFaults>>,
    puts: Arc<AtomicUsize>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every `put_order` call.
    pub async fn set_fail_on_put(&self, fail: bool) {
        self.faults.write().await.fail_on_put = fail;
    }

    /// Delays every `put_order` call.
    pub async fn set_put_latency(&self, latency: Duration) {
        self.faults.write().await.put_latency = Some(latency);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns all stored orders in insertion order.
    pub async fn orders(&self) -> Vec<OrderRecord> {
        self.orders.read().await.clone()
    }

    /// Number of `put_order` calls received.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn put_order(&self, record: &OrderRecord) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let (failing, latency) = {
            let faults = self.faults.read().await;
            (faults.fail_on_put, faults.put_latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(StoreError::Unavailable(format!(
                "write of order {} failed",
                record.order_id
            )));
        }

        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.order_id == record.order_id) {
            return Err(StoreError::DuplicateOrder(record.order_id));
        }
        orders.push(record.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned())
    }
}
