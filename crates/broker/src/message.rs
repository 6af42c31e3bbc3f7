//! Wire-level message envelopes.
//!
//! Bodies are line-delimited JSON: one object per message, published bodies
//! terminated by `\n`. Envelopes live only for the duration of handling and
//! are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Result;

/// Order status broadcast from an upstream system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdateMessage {
    pub order_id: String,

    /// Human-readable status name, not an internal status ID.
    pub status: String,
}

/// Payment processor result for an order.
///
/// Identifier fields default to empty strings so that a message missing them
/// reaches validation and is rejected with a precise reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmationMessage {
    #[serde(rename = "type", default)]
    pub message_type: String,

    #[serde(default)]
    pub order_id: String,

    #[serde(default)]
    pub payment_id: String,

    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Compensation request for an order that failed upstream validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderErrorMessage {
    pub order_id: String,

    #[serde(default)]
    pub reason: String,
}

/// One line of a kitchen notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Notification published to the kitchen once an order is paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenNotification {
    #[serde(rename = "type")]
    pub message_type: String,

    pub order_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    pub items: Vec<KitchenItem>,

    pub status: String,

    pub created_at: DateTime<Utc>,

    pub paid_at: DateTime<Utc>,

    pub total_amount: f64,

    pub payment_method: String,
}

impl KitchenNotification {
    /// Value of the `type` field for paid-order notifications.
    pub const ORDER_PAID: &'static str = "order_paid";
}

/// Serializes a message as one JSON line.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec(message)?;
    body.push(b'\n');
    Ok(body)
}

/// Parses one message body. Surrounding whitespace, including the trailing
/// newline, is ignored.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payment_confirmation() {
        let body = br#"{"type":"payment_confirmation","order_id":"O1","payment_id":"P1","amount":25.0,"status":"confirmed","processed_at":"2024-05-01T12:00:00Z","payment_method":"card","metadata":{"attempt":1}}"#;
        let msg: PaymentConfirmationMessage = decode(body).unwrap();

        assert_eq!(msg.message_type, "payment_confirmation");
        assert_eq!(msg.order_id, "O1");
        assert_eq!(msg.amount, 25.0);
        assert_eq!(msg.payment_method.as_deref(), Some("card"));
        assert_eq!(msg.metadata.unwrap()["attempt"], 1);
        assert!(msg.processed_at.is_some());
    }

    #[test]
    fn missing_payment_fields_default_to_empty() {
        let msg: PaymentConfirmationMessage = decode(br#"{"status":"confirmed"}"#).unwrap();
        assert!(msg.order_id.is_empty());
        assert!(msg.payment_id.is_empty());
        assert_eq!(msg.amount, 0.0);
    }

    #[test]
    fn encoded_bodies_are_single_lines() {
        let body = encode(&OrderUpdateMessage {
            order_id: "O1".to_string(),
            status: "ready".to_string(),
        })
        .unwrap();

        assert_eq!(body.last(), Some(&b'\n'));
        assert_eq!(body.iter().filter(|b| **b == b'\n').count(), 1);

        let back: OrderUpdateMessage = decode(&body).unwrap();
        assert_eq!(back.status, "ready");
    }

    #[test]
    fn kitchen_notification_wire_shape() {
        let now = Utc::now();
        let note = KitchenNotification {
            message_type: KitchenNotification::ORDER_PAID.to_string(),
            order_id: "O1".to_string(),
            customer_id: None,
            items: vec![KitchenItem {
                product_id: "SKU-1".to_string(),
                quantity: 2,
                unit_price: 12.5,
            }],
            status: "paid".to_string(),
            created_at: now,
            paid_at: now,
            total_amount: 25.0,
            payment_method: "card".to_string(),
        };

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["type"], "order_paid");
        assert_eq!(value["status"], "paid");
        assert!(value.get("customer_id").is_none());
        assert_eq!(value["items"][0]["quantity"], 2);
    }

    #[test]
    fn order_error_requires_order_id() {
        assert!(decode::<OrderErrorMessage>(br#"{"reason":"bad"}"#).is_err());
    }
}
