//! Order status records.

use common::StatusId;
use serde::{Deserialize, Serialize};

use super::{Name, OrderState};
use crate::error::ValidationError;

/// Status names the payment lifecycle understands.
///
/// Seeded status records use these values as both ID and name.
pub mod status_names {
    pub const PENDING: &str = "pending";
    pub const CREATED: &str = "created";
    pub const PAID: &str = "paid";
    pub const FAILED: &str = "failed";
    pub const CANCELLED: &str = "cancelled";

    /// Every well-known status, in lifecycle order.
    pub const ALL: [&str; 5] = [PENDING, CREATED, PAID, FAILED, CANCELLED];
}

/// A status an order can be in.
///
/// Acts both as a domain value and as a lookup key: synchronous callers
/// resolve it by ID, upstream systems address it by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    id: StatusId,
    name: Name,
}

impl OrderStatus {
    /// Creates a status, validating the name.
    pub fn new(id: impl Into<StatusId>, name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: id.into(),
            name: Name::new(name)?,
        })
    }

    pub fn id(&self) -> &StatusId {
        &self.id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the lifecycle state this status maps to.
    pub fn state(&self) -> OrderState {
        OrderState::from_status_name(self.name.as_str())
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
