//! Order aggregate and related types.

mod aggregate;
mod item;
mod state;
mod status;
mod value_objects;

pub use aggregate::{Order, OrderParts};
pub use item::OrderItem;
pub use state::{OrderState, PaymentOutcome};
pub use status::{OrderStatus, status_names};
pub use value_objects::{Amount, Money, Name, ProductId, Quantity, UnitPrice};
