use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{
    auth::{AdminUser, AuthenticatedUser},
    entities::chat_message::ChatSender,
    errors::ApiError,
    services::chat::PostMessageInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Customer support-chat routes; each user sees only their own thread.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_my_thread))
        .route("/", post(post_to_my_thread))
}

/// Back-office support-chat routes.
pub fn admin_chat_routes() -> Router<AppState> {
    Router::new()
        .route("/threads", get(list_threads))
        .route("/threads/:user_id", get(get_thread))
        .route("/threads/:user_id", post(reply_to_thread))
        .route("/threads/:user_id/read", post(mark_thread_read))
}

/// Get the current user's support thread
#[utoipa::path(
    get,
    path = "/api/v1/chat",
    responses((status = 200, description = "Thread messages, oldest first")),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn get_my_thread(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .services
        .chat
        .list_thread(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(messages))
}

/// Post a message to the current user's support thread
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    request_body = PostMessageInput,
    responses(
        (status = 200, description = "Message posted"),
        (status = 400, description = "Invalid message", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn post_to_my_thread(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<PostMessageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .services
        .chat
        .post_message(user.id, ChatSender::User, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(message))
}

/// List support threads with unread counts (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/chat/threads",
    responses((status = 200, description = "Thread summaries, newest activity first")),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_threads(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let threads = state
        .services
        .chat
        .list_threads()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(threads))
}

/// Get a user's support thread (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/chat/threads/{user_id}",
    params(("user_id" = Uuid, Path, description = "Thread owner's user id")),
    responses((status = 200, description = "Thread messages, oldest first")),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_thread(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .services
        .chat
        .list_thread(user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(messages))
}

/// Reply to a user's support thread (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/chat/threads/{user_id}",
    params(("user_id" = Uuid, Path, description = "Thread owner's user id")),
    request_body = PostMessageInput,
    responses((status = 200, description = "Reply posted")),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reply_to_thread(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<PostMessageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .services
        .chat
        .post_message(user_id, ChatSender::Admin, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(message))
}

/// Mark a thread's user messages as read (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/chat/threads/{user_id}/read",
    params(("user_id" = Uuid, Path, description = "Thread owner's user id")),
    responses((status = 204, description = "Thread marked read")),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn mark_thread_read(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .chat
        .mark_thread_read(user_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
