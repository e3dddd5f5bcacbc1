use crate::{
    errors::ServiceError,
    payments::reconciliation::{self, CheckoutEvent},
    services::orders::TransitionOutcome,
    AppState,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(payment_webhook))
}

/// Card-provider callback. The signature is checked over the raw bytes
/// before any parsing; reconciliation itself is pure and the resulting
/// transition is applied with a status guard, so replays are harmless.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event processed or ignored"),
        (status = 400, description = "Invalid signature or unparseable event", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = &state.config.card_webhook_secret {
        let signature = headers
            .get("Stripe-Signature")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                ServiceError::BadRequest("missing webhook signature header".to_string())
            })?;

        reconciliation::verify_signature(
            &body,
            signature,
            secret,
            state.config.card_webhook_tolerance_secs as i64,
            chrono::Utc::now().timestamp(),
        )?;
    } else {
        warn!("Webhook secret not configured; accepting unsigned webhook");
    }

    let json: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let event = reconciliation::parse_event(&json)?;
    if let CheckoutEvent::Ignored { event_type } = &event {
        info!(%event_type, "Ignoring unhandled webhook event");
        return Ok((StatusCode::OK, "ok"));
    }

    let Some(intent) = reconciliation::reconcile(event) else {
        return Ok((StatusCode::OK, "ok"));
    };
    let clear_cart = intent.clear_cart_on_apply;

    match state.services.orders.apply_transition(&intent).await? {
        TransitionOutcome::Applied(order) => {
            // The cart is cleared only on the first application; a replayed
            // completion lands in AlreadySettled and leaves any rebuilt cart
            // alone.
            if clear_cart {
                state.services.cart.clear_cart(order.user_id).await?;
            }
            info!(order_id = %order.id, status = ?order.status, "Webhook reconciled");
        }
        TransitionOutcome::AlreadySettled(order) => {
            info!(order_id = %order.id, status = ?order.status, "Webhook replay; order already settled");
        }
        TransitionOutcome::NotFound => {
            warn!("Webhook references an unknown order; nothing mutated");
        }
    }

    Ok((StatusCode::OK, "ok"))
}
