//! Message handler contract and delivery-failure classification.

use async_trait::async_trait;

/// Receives decoded messages from a broker worker.
///
/// Returning `Ok` acknowledges the message. Returning an error hands it to
/// [`classify`], which decides between discarding and requeueing.
#[async_trait]
pub trait MessageHandler<M: Send + 'static>: Send + Sync {
    async fn handle(&self, message: M) -> Result<(), HandlerError>;
}

/// What kind of failure a handler hit.
///
/// Carried through the error value so the retry policy does not depend on
/// message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The message itself is malformed or fails validation.
    InvalidInput,
    /// The referenced order or status does not exist.
    NotFound,
    /// A concurrent writer won the optimistic version check.
    Conflict,
    /// Storage failed for a reason that may clear up.
    Persistence,
    /// Network hiccups, timeouts and other passing faults.
    Transient,
    /// No kind was attached; classification falls back to the error text.
    Unclassified,
}

impl ErrorKind {
    /// Returns true if redelivering the message can ever succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}

/// Error returned by a [`MessageHandler`].
#[derive(Debug)]
pub struct HandlerError {
    kind: ErrorKind,
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl HandlerError {
    pub fn new(kind: ErrorKind, error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            kind,
            source: error.into(),
        }
    }

    pub fn invalid_input(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::new(ErrorKind::InvalidInput, error)
    }

    pub fn not_found(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::new(ErrorKind::NotFound, error)
    }

    pub fn transient(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::new(ErrorKind::Transient, error)
    }

    pub fn unclassified(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::new(ErrorKind::Unclassified, error)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.source.fmt(f)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// How a backend settles a message after handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Handled; remove from the queue.
    Ack,
    /// Can never succeed; remove without redelivery.
    Discard,
    /// May succeed later; make it available for redelivery.
    Requeue,
}

/// Error phrases that mark a message as permanently unprocessable.
///
/// This is the minimum set; typed [`ErrorKind`]s take precedence.
const NON_RECOVERABLE_PHRASES: [&str; 6] = [
    "Order not found",
    "Invalid order ID",
    "Invalid payment confirmation",
    "order ID is required",
    "payment ID is required",
    "payment status is required",
];

/// Returns true if the rendered error text matches a non-recoverable phrase.
pub fn should_discard_message(error_text: &str) -> bool {
    NON_RECOVERABLE_PHRASES
        .iter()
        .any(|phrase| error_text.contains(phrase))
}

/// Decides between discarding and requeueing a failed message.
///
/// The error kind decides; only unclassified errors fall back to matching
/// their text against the non-recoverable phrases.
pub fn classify(error: &HandlerError) -> Disposition {
    match error.kind() {
        ErrorKind::Unclassified if should_discard_message(&error.to_string()) => {
            Disposition::Discard
        }
        ErrorKind::Unclassified => Disposition::Requeue,
        kind if kind.is_recoverable() => Disposition::Requeue,
        _ => Disposition::Discard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_phrases_match() {
        for text in [
            "failed to find order O1: Order not found: O1",
            "Invalid order ID: ''",
            "Invalid payment confirmation: amount must be greater than 0",
            "validation failed: order ID is required",
            "payment ID is required",
            "payment status is required",
        ] {
            assert!(should_discard_message(text), "{text}");
        }
    }

    #[test]
    fn other_texts_are_retryable() {
        for text in [
            "connection reset by peer",
            "context deadline exceeded",
            "Storage unavailable: timeout",
            "order not found", // matching is case-sensitive
            "",
        ] {
            assert!(!should_discard_message(text), "{text}");
        }
    }

    #[test]
    fn typed_kinds_drive_classification() {
        assert_eq!(
            classify(&HandlerError::invalid_input("bad payload")),
            Disposition::Discard
        );
        assert_eq!(
            classify(&HandlerError::not_found("missing status")),
            Disposition::Discard
        );
        assert_eq!(
            classify(&HandlerError::transient("timeout")),
            Disposition::Requeue
        );
        assert_eq!(
            classify(&HandlerError::new(ErrorKind::Conflict, "stale version")),
            Disposition::Requeue
        );
    }

    #[test]
    fn typed_kind_wins_over_text() {
        // A storage outage whose text happens to mention a phrase is still retried.
        let err = HandlerError::new(ErrorKind::Persistence, "Order not found in replica, retry");
        assert_eq!(classify(&err), Disposition::Requeue);
    }

    #[test]
    fn unclassified_falls_back_to_text() {
        assert_eq!(
            classify(&HandlerError::unclassified("Order not found: O9")),
            Disposition::Discard
        );
        assert_eq!(
            classify(&HandlerError::unclassified("broken pipe")),
            Disposition::Requeue
        );
    }

    #[test]
    fn display_renders_source_text() {
        let err = HandlerError::not_found("Order not found: O1");
        assert_eq!(err.to_string(), "Order not found: O1");
        assert!(std::error::Error::source(&err).is_some());
    }
}
