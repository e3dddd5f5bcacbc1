//! Webhook reconciliation, split into pure steps: verify the signature,
//! parse the event, decide the transition. The handler applies the decided
//! transition through the order service; nothing in this module touches I/O.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

use crate::{entities::order::OrderStatus, errors::ServiceError};

type HmacSha256 = Hmac<Sha256>;

/// Recognized processor events, reduced to the fields reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    SessionCompleted {
        order_id: Uuid,
        payment_reference: Option<String>,
    },
    SessionExpired {
        order_id: Uuid,
    },
    PaymentFailed {
        payment_reference: String,
    },
    Ignored {
        event_type: String,
    },
}

/// How to find the order a transition applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    ById(Uuid),
    ByPaymentReference(String),
}

/// A decided state transition, ready to be applied conditionally against the
/// order's current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionIntent {
    pub lookup: OrderLookup,
    pub target: OrderStatus,
    pub payment_reference: Option<String>,
    pub clear_cart_on_apply: bool,
}

/// Verifies a `t=<epoch>,v1=<hex hmac>` signature header over the raw body.
/// The signed string is `"{t}.{body}"`; the timestamp must be within the
/// configured tolerance of `now_epoch`. Failures are reported as bad
/// requests so the processor sees a 4xx and surfaces them in its delivery
/// log rather than retrying indefinitely.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_epoch: i64,
) -> Result<(), ServiceError> {
    let mut ts = "";
    let mut v1 = "";
    for part in signature_header.split(',') {
        let mut it = part.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }

    if ts.is_empty() || v1.is_empty() {
        return Err(ServiceError::BadRequest(
            "malformed webhook signature header".to_string(),
        ));
    }

    let ts_i: i64 = ts.parse().map_err(|_| {
        ServiceError::BadRequest("malformed webhook timestamp".to_string())
    })?;
    if (now_epoch - ts_i).abs() > tolerance_secs {
        return Err(ServiceError::BadRequest(
            "webhook timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InternalError("invalid webhook secret".to_string()))?;
    mac.update(ts.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(&expected, v1) {
        return Err(ServiceError::BadRequest(
            "invalid webhook signature".to_string(),
        ));
    }
    Ok(())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Parses a verified webhook payload into a [`CheckoutEvent`]. Events the
/// service does not act on come back as `Ignored`; events we do act on but
/// that are missing their correlation fields are rejected so the processor
/// retries them after the bug is fixed.
pub fn parse_event(json: &Value) -> Result<CheckoutEvent, ServiceError> {
    let event_type = json.get("type").and_then(|v| v.as_str()).unwrap_or("");
    let object = json.get("data").and_then(|d| d.get("object"));

    match event_type {
        "checkout.session.completed" => {
            let order_id = metadata_order_id(object)?;
            let payment_reference = object
                .and_then(|o| o.get("payment_intent"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            Ok(CheckoutEvent::SessionCompleted {
                order_id,
                payment_reference,
            })
        }
        "checkout.session.expired" => {
            let order_id = metadata_order_id(object)?;
            Ok(CheckoutEvent::SessionExpired { order_id })
        }
        "payment_intent.payment_failed" => {
            let payment_reference = object
                .and_then(|o| o.get("id"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    ServiceError::BadRequest(
                        "payment failure event missing payment intent id".to_string(),
                    )
                })?;
            Ok(CheckoutEvent::PaymentFailed { payment_reference })
        }
        other => Ok(CheckoutEvent::Ignored {
            event_type: other.to_string(),
        }),
    }
}

fn metadata_order_id(object: Option<&Value>) -> Result<Uuid, ServiceError> {
    object
        .and_then(|o| o.get("metadata"))
        .and_then(|m| m.get("order_id"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            ServiceError::BadRequest("checkout event missing order_id metadata".to_string())
        })
        .and_then(|s| {
            Uuid::parse_str(s).map_err(|_| {
                ServiceError::BadRequest("checkout event carries malformed order_id".to_string())
            })
        })
}

/// Maps a parsed event to the transition it implies, if any. The cart is
/// only flagged for clearing on a completed payment; the caller clears it
/// only when the transition actually applies, so replayed events never wipe
/// a rebuilt cart.
pub fn reconcile(event: CheckoutEvent) -> Option<TransitionIntent> {
    match event {
        CheckoutEvent::SessionCompleted {
            order_id,
            payment_reference,
        } => Some(TransitionIntent {
            lookup: OrderLookup::ById(order_id),
            target: OrderStatus::Paid,
            payment_reference,
            clear_cart_on_apply: true,
        }),
        CheckoutEvent::SessionExpired { order_id } => Some(TransitionIntent {
            lookup: OrderLookup::ById(order_id),
            target: OrderStatus::Failed,
            payment_reference: None,
            clear_cart_on_apply: false,
        }),
        CheckoutEvent::PaymentFailed { payment_reference } => Some(TransitionIntent {
            lookup: OrderLookup::ByPaymentReference(payment_reference),
            target: OrderStatus::Failed,
            payment_reference: None,
            clear_cart_on_apply: false,
        }),
        CheckoutEvent::Ignored { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_unit_test_secret";

    fn sign(payload: &[u8], ts: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.", ts).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, 1_700_000_000);

        verify_signature(payload, &header, SECRET, 300, 1_700_000_100)
            .expect("fresh, correctly signed payload verifies");
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, 1_700_000_000);

        let err = verify_signature(b"{}", &header, SECRET, 300, 1_700_000_100)
            .expect_err("altered body must fail");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = br#"{}"#;
        let header = sign(payload, 1_700_000_000);

        let err = verify_signature(payload, &header, SECRET, 300, 1_700_001_000)
            .expect_err("timestamp past tolerance must fail");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn rejects_missing_signature_parts() {
        let err = verify_signature(b"{}", "t=123", SECRET, 300, 123)
            .expect_err("header without v1 must fail");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn parses_session_completed() {
        let order_id = Uuid::new_v4();
        let json = json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "payment_intent": "pi_123",
                "metadata": { "order_id": order_id.to_string() }
            }}
        });

        let event = parse_event(&json).expect("well-formed event parses");
        assert_eq!(
            event,
            CheckoutEvent::SessionCompleted {
                order_id,
                payment_reference: Some("pi_123".to_string()),
            }
        );
    }

    #[test]
    fn completed_session_without_order_id_is_rejected() {
        let json = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "metadata": {} } }
        });

        let err = parse_event(&json).expect_err("missing order_id must be rejected");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn unrecognized_events_are_ignored() {
        let json = json!({ "type": "invoice.created", "data": { "object": {} } });

        let event = parse_event(&json).expect("unknown types are not errors");
        assert_eq!(
            event,
            CheckoutEvent::Ignored {
                event_type: "invoice.created".to_string()
            }
        );
        assert_eq!(reconcile(event), None);
    }

    #[test]
    fn completed_session_implies_paid_and_cart_clear() {
        let order_id = Uuid::new_v4();
        let intent = reconcile(CheckoutEvent::SessionCompleted {
            order_id,
            payment_reference: Some("pi_123".to_string()),
        })
        .expect("completed session produces a transition");

        assert_eq!(intent.lookup, OrderLookup::ById(order_id));
        assert_eq!(intent.target, OrderStatus::Paid);
        assert!(intent.clear_cart_on_apply);
        assert_eq!(intent.payment_reference.as_deref(), Some("pi_123"));
    }

    #[test]
    fn payment_failure_resolves_order_by_reference() {
        let intent = reconcile(CheckoutEvent::PaymentFailed {
            payment_reference: "pi_456".to_string(),
        })
        .expect("failure produces a transition");

        assert_eq!(
            intent.lookup,
            OrderLookup::ByPaymentReference("pi_456".to_string())
        );
        assert_eq!(intent.target, OrderStatus::Failed);
        assert!(!intent.clear_cart_on_apply);
    }
}
