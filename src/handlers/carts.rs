use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{
    auth::AuthenticatedUser, errors::ApiError, services::cart::AddCartEntryInput, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Cart routes; the cart is implicit per authenticated user.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/entries", post(add_entry))
        .route("/entries/:product_id", put(update_entry))
        .route("/entries/:product_id", delete(remove_entry))
        .route("/clear", post(clear_cart))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Get the current user's cart
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses((status = 200, description = "Cart with priced lines")),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add a product to the cart (or replace its quantity)
#[utoipa::path(
    post,
    path = "/api/v1/cart/entries",
    request_body = AddCartEntryInput,
    responses(
        (status = 200, description = "Entry added or replaced"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<AddCartEntryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .cart
        .add_entry(user.id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}

/// Set the quantity of a carted product; zero removes it
#[utoipa::path(
    put,
    path = "/api/v1/cart/entries/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated"),
        (status = 404, description = "Product not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .cart
        .update_quantity(user.id, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}

/// Remove a product from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart/entries/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses((status = 204, description = "Entry removed")),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_entry(user.id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Empty the cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/clear",
    responses((status = 204, description = "Cart emptied")),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
