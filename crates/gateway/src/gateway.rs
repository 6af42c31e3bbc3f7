use async_trait::async_trait;
use common::{OrderId, StatusId};
use domain::{Order, OrderStatus};

use crate::{OrderFilter, Result};

/// Persistence gateway for order aggregates.
///
/// All implementations must be thread-safe (Send + Sync). Every call either
/// fully succeeds or leaves storage untouched.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Stores a new order.
    ///
    /// Fails with `AlreadyExists` if the ID is taken. Returns the stored order
    /// with its first persisted version.
    async fn create(&self, order: &Order) -> Result<Order>;

    /// Loads an order. Fails with `OrderNotFound` if it does not exist.
    async fn find_by_id(&self, id: &OrderId) -> Result<Order>;

    /// Lists orders matching the filter, oldest first.
    async fn find_all(&self, filter: OrderFilter) -> Result<Vec<Order>>;

    /// Persists the current state of an order.
    ///
    /// The order's version must match the stored version, otherwise the call
    /// fails with `VersionConflict`. Returns the order with its new version.
    async fn update(&self, order: &Order) -> Result<Order>;

    /// Removes an order and its items. Fails with `OrderNotFound` if missing.
    async fn delete(&self, id: &OrderId) -> Result<()>;
}

/// Read-only gateway for order status records.
///
/// Both lookup contracts are kept: synchronous callers know status IDs,
/// upstream systems only know status names.
#[async_trait]
pub trait OrderStatusGateway: Send + Sync {
    /// Lists every status.
    async fn find_all(&self) -> Result<Vec<OrderStatus>>;

    /// Loads a status by ID. Fails with `StatusNotFound` if missing.
    async fn find_by_id(&self, id: &StatusId) -> Result<OrderStatus>;

    /// Loads a status by its human-readable name. Fails with
    /// `StatusNameNotFound` if missing.
    async fn find_by_name(&self, name: &str) -> Result<OrderStatus>;
}
