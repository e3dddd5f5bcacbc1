use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::checkout::{CardCheckoutInput, WalletCaptureInput, WalletCheckoutInput},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/quote", get(quote))
        .route("/session", post(start_card_checkout))
        .route("/wallet", post(start_wallet_checkout))
        .route("/wallet/capture", post(capture_wallet_order))
}

/// Price the cart without creating an order
#[utoipa::path(
    get,
    path = "/api/v1/checkout/quote",
    responses(
        (status = 200, description = "Priced cart with shipping and total"),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let priced = state
        .services
        .checkout
        .price_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(priced))
}

/// Start a card checkout: creates a pending order and a hosted session
#[utoipa::path(
    post,
    path = "/api/v1/checkout/session",
    request_body(content = CardCheckoutInput, description = "Optional delivery details; the cart itself is read server-side"),
    responses(
        (status = 200, description = "Redirect URL for the hosted checkout page"),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 502, description = "Card provider unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn start_card_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Option<Json<CardCheckoutInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = body.map(|Json(input)| input).unwrap_or_default();
    validate_input(&payload)?;

    let response = state
        .services
        .checkout
        .start_card_checkout(user.id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}

/// Start a wallet checkout for the cart or a single product
#[utoipa::path(
    post,
    path = "/api/v1/checkout/wallet",
    request_body = WalletCheckoutInput,
    responses(
        (status = 200, description = "Provider order awaiting shopper approval"),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 502, description = "Wallet provider unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn start_wallet_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<WalletCheckoutInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let response = state
        .services
        .checkout
        .start_wallet_checkout(user.id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}

/// Capture an approved wallet order
#[utoipa::path(
    post,
    path = "/api/v1/checkout/wallet/capture",
    request_body = WalletCaptureInput,
    responses(
        (status = 200, description = "Order settled"),
        (status = 402, description = "Capture was not completed", body = crate::errors::ErrorResponse),
        (status = 502, description = "Wallet provider unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn capture_wallet_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<WalletCaptureInput>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .services
        .checkout
        .capture_wallet_order(user.id, &payload.provider_order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}
