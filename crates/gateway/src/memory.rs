use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, StatusId};
use domain::{Order, OrderStatus, status_names};
use tokio::sync::RwLock;

use crate::{
    GatewayError, OrderFilter, OrderRecord, OrderStatusRecord, Result,
    gateway::{OrderGateway, OrderStatusGateway},
};

#[derive(Debug, Default)]
struct OrderTable {
    rows: HashMap<String, OrderRecord>,
    unavailable: bool,
    update_calls: usize,
    delete_calls: usize,
}

/// In-memory order gateway.
///
/// Stores orders as [`OrderRecord`]s so the aggregate mapping is exercised
/// exactly as a database-backed gateway would. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderGateway {
    table: Arc<RwLock<OrderTable>>,
}

impl InMemoryOrderGateway {
    /// Creates a new empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `Unavailable` until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.table.write().await.unavailable = unavailable;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Returns how many times `update` was called, successful or not.
    pub async fn update_calls(&self) -> usize {
        self.table.read().await.update_calls
    }

    /// Returns how many times `delete` was called, successful or not.
    pub async fn delete_calls(&self) -> usize {
        self.table.read().await.delete_calls
    }

    fn check_available(table: &OrderTable) -> Result<()> {
        if table.unavailable {
            return Err(GatewayError::Unavailable(
                "in-memory order table is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderGateway for InMemoryOrderGateway {
    async fn create(&self, order: &Order) -> Result<Order> {
        let mut table = self.table.write().await;
        Self::check_available(&table)?;

        if table.rows.contains_key(order.id().as_str()) {
            return Err(GatewayError::AlreadyExists(order.id().clone()));
        }

        let mut stored = order.clone();
        stored.set_version(1);
        table
            .rows
            .insert(order.id().to_string(), OrderRecord::from(&stored));

        tracing::debug!(order_id = %order.id(), "order created");
        Ok(stored)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Order> {
        let table = self.table.read().await;
        Self::check_available(&table)?;

        let record = table
            .rows
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::OrderNotFound(id.clone()))?;
        Ok(Order::try_from(record)?)
    }

    async fn find_all(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let table = self.table.read().await;
        Self::check_available(&table)?;

        let mut orders = table
            .rows
            .values()
            .cloned()
            .map(Order::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        orders.retain(|order| filter.matches(order));

        // Sort by creation time then ID for a stable listing
        orders.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });

        let offset = filter.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        let orders = match filter.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        };

        Ok(orders)
    }

    async fn update(&self, order: &Order) -> Result<Order> {
        let mut table = self.table.write().await;
        table.update_calls += 1;
        Self::check_available(&table)?;

        let current = table
            .rows
            .get(order.id().as_str())
            .map(|record| record.version)
            .ok_or_else(|| GatewayError::OrderNotFound(order.id().clone()))?;

        if current != order.version() {
            return Err(GatewayError::VersionConflict {
                order_id: order.id().clone(),
                expected: order.version(),
                actual: current,
            });
        }

        let mut stored = order.clone();
        stored.set_version(current + 1);
        table
            .rows
            .insert(order.id().to_string(), OrderRecord::from(&stored));

        tracing::debug!(
            order_id = %order.id(),
            version = stored.version(),
            status = %stored.status().name(),
            "order updated"
        );
        Ok(stored)
    }

    async fn delete(&self, id: &OrderId) -> Result<()> {
        let mut table = self.table.write().await;
        table.delete_calls += 1;
        Self::check_available(&table)?;

        table
            .rows
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| GatewayError::OrderNotFound(id.clone()))
    }
}

/// In-memory order status gateway.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStatusGateway {
    rows: Arc<RwLock<Vec<OrderStatusRecord>>>,
}

impl InMemoryOrderStatusGateway {
    /// Creates a new empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway seeded with the well-known lifecycle statuses, each
    /// using its name as ID.
    pub fn with_defaults() -> Self {
        let rows = status_names::ALL
            .iter()
            .map(|name| OrderStatusRecord {
                id: name.to_string(),
                name: name.to_string(),
            })
            .collect();
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Inserts or replaces a status.
    pub async fn insert(&self, status: &OrderStatus) {
        let mut rows = self.rows.write().await;
        let record = OrderStatusRecord::from(status);
        match rows.iter_mut().find(|row| row.id == record.id) {
            Some(row) => *row = record,
            None => rows.push(record),
        }
    }
}

#[async_trait]
impl OrderStatusGateway for InMemoryOrderStatusGateway {
    async fn find_all(&self) -> Result<Vec<OrderStatus>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .cloned()
            .map(OrderStatus::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn find_by_id(&self, id: &StatusId) -> Result<OrderStatus> {
        let rows = self.rows.read().await;
        let record = rows
            .iter()
            .find(|row| row.id == id.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::StatusNotFound(id.clone()))?;
        Ok(OrderStatus::try_from(record)?)
    }

    async fn find_by_name(&self, name: &str) -> Result<OrderStatus> {
        let rows = self.rows.read().await;
        let wanted = name.trim();
        let record = rows
            .iter()
            .find(|row| row.name.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| GatewayError::StatusNameNotFound(name.to_string()))?;
        Ok(OrderStatus::try_from(record)?)
    }
}
