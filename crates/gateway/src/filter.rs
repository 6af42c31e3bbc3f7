use common::{CustomerId, StatusId};
use domain::Order;

/// Filter for listing orders.
///
/// Allows filtering orders by status and customer, with offset/limit paging.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Filter by current status ID.
    pub status_id: Option<StatusId>,

    /// Filter by customer.
    pub customer_id: Option<CustomerId>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderFilter {
    /// Creates a new empty filter matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by status ID.
    pub fn status(mut self, status_id: impl Into<StatusId>) -> Self {
        self.status_id = Some(status_id.into());
        self
    }

    /// Filters by customer.
    pub fn customer(mut self, customer_id: impl Into<CustomerId>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the order satisfies every predicate of this filter.
    ///
    /// Paging is not a predicate and is applied by the gateway.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(ref status_id) = self.status_id
            && order.status().id() != status_id
        {
            return false;
        }
        if let Some(ref customer_id) = self.customer_id
            && order.customer_id() != Some(customer_id)
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::{Money, OrderItem, OrderStatus};

    fn order(customer: Option<&str>, status: &str) -> Order {
        let id = OrderId::generate();
        let item = OrderItem::try_new(id.clone(), "SKU-1", 1, Money::from_cents(100)).unwrap();
        Order::new(
            id,
            customer.map(CustomerId::from),
            OrderStatus::new(status, status).unwrap(),
            vec![item],
        )
        .unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(OrderFilter::new().matches(&order(None, "pending")));
    }

    #[test]
    fn status_and_customer_predicates() {
        let o = order(Some("C1"), "paid");
        assert!(OrderFilter::new().status("paid").matches(&o));
        assert!(!OrderFilter::new().status("pending").matches(&o));
        assert!(OrderFilter::new().customer("C1").matches(&o));
        assert!(!OrderFilter::new().customer("C2").matches(&o));
        assert!(!OrderFilter::new().customer("C1").matches(&order(None, "paid")));
    }

    #[test]
    fn builder_sets_paging() {
        let filter = OrderFilter::new().limit(10).offset(5);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, Some(5));
    }
}
