#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    entities::{
        order::{self, OrderStatus},
        product,
        user::{self, UserRole},
    },
    events::{process_events, EventSender},
    migrator::Migrator,
    AppState,
};

/// In-memory test application: SQLite, real migrations, real services, no
/// external providers (email disabled, gateways never called).
pub struct TestApp {
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts).await.expect("sqlite connects");
    Migrator::up(&db, None).await.expect("migrations apply");

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(process_events(rx));

    let config = AppConfig::new("sqlite::memory:", "t".repeat(32));
    let state = AppState::new(
        Arc::new(db),
        Arc::new(config),
        Arc::new(EventSender::new(tx)),
    )
    .expect("app state builds");

    TestApp { state }
}

pub async fn create_user(app: &TestApp, role: UserRole) -> user::Model {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        external_subject: Set(format!("auth0|{}", id.simple())),
        email: Set(format!("{}@example.com", id.simple())),
        display_name: Set("Test User".to_string()),
        role: Set(role),
        status: Set("ACTIVE".to_string()),
        last_active_at: Set(Utc::now()),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(&*app.state.db)
    .await
    .expect("user inserts")
}

pub async fn create_product(app: &TestApp, title: &str, price: Decimal) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        description: Set(format!("{} description", title)),
        category: Set("general".to_string()),
        price: Set(price),
        image_urls: Set(serde_json::json!([])),
        featured: Set(false),
        banner: Set(false),
        filters: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(&*app.state.db)
    .await
    .expect("product inserts")
}

pub async fn create_order(
    app: &TestApp,
    user_id: Uuid,
    total: Decimal,
    status: OrderStatus,
) -> order::Model {
    create_order_with_reference(app, user_id, total, status, None).await
}

pub async fn create_order_with_reference(
    app: &TestApp,
    user_id: Uuid,
    total: Decimal,
    status: OrderStatus,
    payment_reference: Option<&str>,
) -> order::Model {
    order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        product_id: Set(None),
        total_amount: Set(total),
        currency: Set("USD".to_string()),
        status: Set(status),
        tracking_number: Set(None),
        payment_reference: Set(payment_reference.map(|r| r.to_string())),
        shipping_address: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(&*app.state.db)
    .await
    .expect("order inserts")
}
