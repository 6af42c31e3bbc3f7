//! Payment lifecycle state machine.

use serde::{Deserialize, Serialize};

use super::status_names;

/// Lifecycle state of an order, derived from its current status name.
///
/// State transitions driven by payment events:
/// ```text
/// Pending ──┬──► Paid
/// Created ──┤
///           └──► Failed   (payment failed or cancelled)
/// ```
/// `Paid`, `Failed` and `Cancelled` are terminal. `Unknown` covers any status
/// name the payment lifecycle does not recognise and accepts nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    Pending,
    Created,
    Paid,
    Failed,
    Cancelled,
    Unknown,
}

impl OrderState {
    /// Maps a status name (case-insensitive, surrounding whitespace ignored)
    /// to a lifecycle state.
    pub fn from_status_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            status_names::PENDING => OrderState::Pending,
            status_names::CREATED => OrderState::Created,
            status_names::PAID => OrderState::Paid,
            status_names::FAILED => OrderState::Failed,
            status_names::CANCELLED => OrderState::Cancelled,
            _ => OrderState::Unknown,
        }
    }

    /// Returns true if a payment outcome may still change this order.
    pub fn can_accept_payment(&self) -> bool {
        matches!(self, OrderState::Pending | OrderState::Created)
    }

    /// Returns true if the given payment outcome is a legal transition from
    /// this state.
    pub fn accepts(&self, outcome: PaymentOutcome) -> bool {
        match outcome {
            PaymentOutcome::Confirmed | PaymentOutcome::Failed | PaymentOutcome::Cancelled => {
                self.can_accept_payment()
            }
        }
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Paid | OrderState::Failed | OrderState::Cancelled
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Created => "created",
            OrderState::Paid => "paid",
            OrderState::Failed => "failed",
            OrderState::Cancelled => "cancelled",
            OrderState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment result reported by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Confirmed,
    Failed,
    Cancelled,
}

impl PaymentOutcome {
    /// Parses a payment status string (case-insensitive).
    ///
    /// Returns `None` for statuses the lifecycle does not know about.
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Some(PaymentOutcome::Confirmed),
            "failed" => Some(PaymentOutcome::Failed),
            "cancelled" => Some(PaymentOutcome::Cancelled),
            _ => None,
        }
    }

    /// Name of the order status this outcome moves an order to.
    pub fn target_status(&self) -> &'static str {
        match self {
            PaymentOutcome::Confirmed => status_names::PAID,
            PaymentOutcome::Failed | PaymentOutcome::Cancelled => status_names::FAILED,
        }
    }

    /// Returns true if the kitchen must be told about the order afterwards.
    pub fn notifies_kitchen(&self) -> bool {
        matches!(self, PaymentOutcome::Confirmed)
    }
}
