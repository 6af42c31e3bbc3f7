use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::{Disposition, MessageHandler, classify, message};

/// Decodes one body, runs the handler and decides how to settle it.
///
/// Shared by every backend so that decoding, classification, logging and
/// metrics behave the same regardless of transport.
pub(crate) async fn dispatch<M>(
    queue: &str,
    body: &[u8],
    handler: &dyn MessageHandler<M>,
) -> Disposition
where
    M: DeserializeOwned + Send + 'static,
{
    let queue_label = queue.to_string();
    metrics::counter!("broker_messages_received_total", "queue" => queue_label.clone())
        .increment(1);

    let message: M = match message::decode(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(queue, error = %e, "discarding undecodable message");
            metrics::counter!("broker_messages_discarded_total", "queue" => queue_label)
                .increment(1);
            return Disposition::Discard;
        }
    };

    let start = Instant::now();
    let result = handler.handle(message).await;
    metrics::histogram!("message_handling_duration_seconds", "queue" => queue_label.clone())
        .record(start.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            tracing::debug!(queue, "message handled");
            metrics::counter!("broker_messages_acked_total", "queue" => queue_label).increment(1);
            Disposition::Ack
        }
        Err(e) => match classify(&e) {
            Disposition::Discard => {
                tracing::warn!(queue, error = %e, kind = ?e.kind(), "discarding unprocessable message");
                metrics::counter!("broker_messages_discarded_total", "queue" => queue_label)
                    .increment(1);
                Disposition::Discard
            }
            _ => {
                tracing::error!(queue, error = %e, kind = ?e.kind(), "message handling failed, requeueing");
                metrics::counter!("broker_messages_requeued_total", "queue" => queue_label)
                    .increment(1);
                Disposition::Requeue
            }
        },
    }
}
