//! Integration tests for the in-memory gateways.
//!
//! These focus on the load-mutate-save cycle used by message consumers and
//! the optimistic version check that guards it.

use common::{CustomerId, OrderId};
use domain::{Money, Order, OrderItem, OrderStatus};
use gateway::{
    GatewayError, InMemoryOrderGateway, InMemoryOrderStatusGateway, OrderFilter, OrderGateway,
    OrderStatusGateway,
};

async fn seed_order(gateway: &InMemoryOrderGateway, id: &str) -> Order {
    let id = OrderId::new(id);
    let items = vec![
        OrderItem::try_new(id.clone(), "SKU-001", 2, Money::from_cents(1000)).unwrap(),
        OrderItem::try_new(id.clone(), "SKU-002", 1, Money::from_cents(500)).unwrap(),
    ];
    let order = Order::new(
        id,
        Some(CustomerId::new("C1")),
        OrderStatus::new("pending", "pending").unwrap(),
        items,
    )
    .unwrap();
    gateway.create(&order).await.unwrap()
}

#[tokio::test]
async fn concurrent_writers_cannot_lose_updates() {
    let orders = InMemoryOrderGateway::new();
    let statuses = InMemoryOrderStatusGateway::with_defaults();
    seed_order(&orders, "O1").await;

    // Two handlers load the same version of the order.
    let mut a = orders.find_by_id(&OrderId::new("O1")).await.unwrap();
    let mut b = orders.find_by_id(&OrderId::new("O1")).await.unwrap();

    a.change_status(statuses.find_by_name("paid").await.unwrap());
    b.change_status(statuses.find_by_name("cancelled").await.unwrap());

    let first = orders.update(&a).await;
    let second = orders.update(&b).await;

    assert!(first.is_ok());
    assert!(matches!(
        second,
        Err(GatewayError::VersionConflict { .. })
    ));

    // A fresh load sees the winning write and can be saved again.
    let mut fresh = orders.find_by_id(&OrderId::new("O1")).await.unwrap();
    assert_eq!(fresh.status().name().as_str(), "paid");
    fresh.change_status(statuses.find_by_name("failed").await.unwrap());
    let saved = orders.update(&fresh).await.unwrap();
    assert_eq!(saved.version(), 3);
}

#[tokio::test]
async fn items_and_amount_survive_persistence() {
    let orders = InMemoryOrderGateway::new();
    let created = seed_order(&orders, "O1").await;

    let loaded = orders.find_by_id(created.id()).await.unwrap();
    assert_eq!(loaded.item_count(), 2);
    assert_eq!(loaded.amount().money().cents(), 2500);
    assert_eq!(loaded.customer_id(), Some(&CustomerId::new("C1")));
}

#[tokio::test]
async fn listing_by_status() {
    let orders = InMemoryOrderGateway::new();
    let statuses = InMemoryOrderStatusGateway::with_defaults();
    for id in ["O1", "O2", "O3"] {
        seed_order(&orders, id).await;
    }

    let mut o2 = orders.find_by_id(&OrderId::new("O2")).await.unwrap();
    o2.change_status(statuses.find_by_name("paid").await.unwrap());
    orders.update(&o2).await.unwrap();

    let paid = orders
        .find_all(OrderFilter::new().status("paid"))
        .await
        .unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].id().as_str(), "O2");

    let pending = orders
        .find_all(OrderFilter::new().status("pending"))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
}
