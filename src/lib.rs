pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod payments;
pub mod services;

use axum::{extract::State, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use config::AppConfig;
use events::EventSender;
use payments::{CardGateway, WalletGateway};
use services::{
    CartService, ChatService, CheckoutService, EmailService, OrderService, ProductService,
    UserService,
};

/// Aggregated domain services handed to HTTP handlers through [`AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub users: UserService,
    pub products: ProductService,
    pub cart: CartService,
    pub orders: OrderService,
    pub checkout: CheckoutService,
    pub chat: ChatService,
    pub email: Arc<EmailService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Result<Self, errors::ServiceError> {
        let email = Arc::new(EmailService::from_config(&config)?);

        let card = Arc::new(CardGateway::new(
            config.card_api_base.clone(),
            config.card_secret_key.clone(),
            config.card_success_url.clone(),
            config.card_cancel_url.clone(),
        ));
        let wallet = Arc::new(WalletGateway::new(
            config.wallet_api_base.clone(),
            config.wallet_client_id.clone(),
            config.wallet_client_secret.clone(),
        ));

        let users = UserService::new(db.clone(), event_sender.clone());
        let products = ProductService::new(db.clone(), event_sender.clone());
        let cart = CartService::new(db.clone(), event_sender.clone());
        let orders = OrderService::new(db.clone(), event_sender.clone(), email.clone());
        let checkout = CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            config,
            card,
            wallet,
            orders.clone(),
            cart.clone(),
        );
        let chat = ChatService::new(db, event_sender);

        Ok(Self {
            users,
            products,
            cart,
            orders,
            checkout,
            chat,
            email,
        })
    }
}

/// Shared application state. Cheap to clone; everything inside is behind an
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: Arc<AppServices>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self, errors::ServiceError> {
        let services = Arc::new(AppServices::new(
            db.clone(),
            event_sender.clone(),
            config.clone(),
        )?);
        Ok(Self {
            db,
            config,
            event_sender,
            services,
        })
    }
}

/// Common response wrapper for status endpoints.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Assembles the versioned API router. Everything under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/products", handlers::products::products_routes())
        .nest("/cart", handlers::carts::carts_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/users", handlers::users::users_routes())
        .nest("/chat", handlers::chat::chat_routes())
        .nest("/payments", handlers::webhooks::webhook_routes())
        .nest("/admin/products", handlers::products::admin_products_routes())
        .nest("/admin/orders", handlers::orders::admin_orders_routes())
        .nest("/admin/users", handlers::users::admin_users_routes())
        .nest("/admin/chat", handlers::chat::admin_chat_routes())
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "storefront-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "database": db_status,
        "email": if state.services.email.is_enabled() { "enabled" } else { "disabled" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
