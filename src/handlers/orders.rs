use crate::handlers::common::{map_service_error, success_response, PaginatedResponse};
use crate::{
    auth::{AdminUser, AuthenticatedUser},
    errors::ApiError,
    services::orders::{OrderQuery, UpdateTrackingInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use uuid::Uuid;

/// Customer-facing order routes.
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_orders))
        .route("/:id", get(get_my_order))
}

/// Back-office order routes.
pub fn admin_orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_orders))
        .route("/:id", get(get_any_order))
        .route("/:id/tracking", put(update_tracking))
}

/// List the current user's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses((status = 200, description = "Orders with line items")),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders_for_user(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Get one of the current user's orders
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with line items"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_my_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order_for_user(id, user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// List orders across all users (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("user_id" = Option<Uuid>, Query, description = "Filter by user"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Page size")
    ),
    responses((status = 200, description = "Order list")),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let (orders, total) = state
        .services
        .orders
        .list_orders(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

/// Get any order with its items (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with line items"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_any_order(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Update fulfilment status and tracking number (admin)
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/tracking",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateTrackingInput,
    responses(
        (status = 200, description = "Order updated"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_tracking(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTrackingInput>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_tracking(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
