//! Integration tests for the Order aggregate and its lifecycle rules.

use common::{CustomerId, OrderId};
use domain::{
    Money, Order, OrderItem, OrderState, OrderStatus, PaymentOutcome, ValidationError,
    status_names,
};

fn status(name: &str) -> OrderStatus {
    OrderStatus::new(name, name).unwrap()
}

mod amount_invariant {
    use super::*;

    #[test]
    fn amount_equals_sum_of_quantity_times_unit_price() {
        // Deterministic sweep over item shapes instead of random generation.
        for item_count in 1..=6u32 {
            for base_price in [1i64, 99, 1000, 12345] {
                let id = OrderId::generate();
                let items: Vec<OrderItem> = (1..=item_count)
                    .map(|n| {
                        OrderItem::try_new(
                            id.clone(),
                            format!("SKU-{n}"),
                            n,
                            Money::from_cents(base_price * n as i64),
                        )
                        .unwrap()
                    })
                    .collect();

                let expected: i64 = items
                    .iter()
                    .map(|i| i.quantity().value() as i64 * i.unit_price().money().cents())
                    .sum();

                let order = Order::new(id, None, status(status_names::PENDING), items).unwrap();
                assert_eq!(order.amount().money().cents(), expected);
            }
        }
    }

    #[test]
    fn empty_order_cannot_compute_amount() {
        let err = Order::new(
            OrderId::generate(),
            Some(CustomerId::new("C1")),
            status(status_names::CREATED),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NoItems);
    }
}

mod payment_lifecycle {
    use super::*;

    fn order_in(status_name: &str) -> Order {
        let id = OrderId::new("O1");
        let item = OrderItem::try_new(id.clone(), "SKU-001", 1, Money::from_cents(2500)).unwrap();
        Order::new(id, None, status(status_name), vec![item]).unwrap()
    }

    #[test]
    fn non_terminal_orders_accept_payment_outcomes() {
        for name in [status_names::PENDING, status_names::CREATED] {
            let order = order_in(name);
            assert!(!order.is_terminal());
            assert!(order.state().accepts(PaymentOutcome::Confirmed));
            assert!(order.state().accepts(PaymentOutcome::Failed));
        }
    }

    #[test]
    fn settled_orders_reject_payment_outcomes() {
        for name in [
            status_names::PAID,
            status_names::FAILED,
            status_names::CANCELLED,
        ] {
            let order = order_in(name);
            assert!(order.is_terminal());
            assert!(!order.state().accepts(PaymentOutcome::Confirmed));
        }
    }

    #[test]
    fn confirmed_payment_moves_order_to_paid() {
        let mut order = order_in(status_names::PENDING);
        let outcome = PaymentOutcome::parse("confirmed").unwrap();
        order.change_status(status(outcome.target_status()));
        assert_eq!(order.state(), OrderState::Paid);
    }
}
