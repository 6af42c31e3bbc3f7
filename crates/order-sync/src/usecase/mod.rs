//! Use cases driven by inbound messages.
//!
//! Each execution is one load → mutate → save cycle. Nothing is cached
//! between messages; the gateway's version check catches concurrent writers
//! and the cycle is repeated with a fresh load.

mod payment;
mod update_status;

pub use payment::{
    PaymentConfirmation, PaymentConfirmationOutcome, ProcessPaymentConfirmationUseCase,
    StatusFallback,
};
pub use update_status::UpdateOrderStatusUseCase;

/// Load-mutate-save attempts before a version conflict is surfaced.
pub(crate) const MAX_UPDATE_ATTEMPTS: u32 = 3;
