use crate::handlers::common::{map_service_error, success_response, PaginatedResponse, PaginationParams};
use crate::{
    auth::{AdminUser, AuthenticatedUser},
    errors::ApiError,
    AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

pub fn users_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn admin_users_routes() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}

/// Get the current account as resolved from the bearer token
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Current account")),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(user: AuthenticatedUser) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(user))
}

/// List accounts (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PaginationParams),
    responses((status = 200, description = "Account list")),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = pagination.clamped();
    let (users, total) = state
        .services
        .users
        .list_users(page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        users, page, per_page, total,
    )))
}
