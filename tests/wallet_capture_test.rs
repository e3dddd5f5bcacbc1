mod common;

use common::{create_order_with_reference, create_product, create_user, spawn_app};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entities::{order, order::OrderStatus, user::UserRole},
    errors::ServiceError,
    services::cart::AddCartEntryInput,
};

#[tokio::test]
async fn capture_of_another_accounts_order_is_rejected() {
    let app = spawn_app().await;
    let owner = create_user(&app, UserRole::User).await;
    let intruder = create_user(&app, UserRole::User).await;
    let product = create_product(&app, "Desk", dec!(80.00)).await;

    let order = create_order_with_reference(
        &app,
        owner.id,
        dec!(180.00),
        OrderStatus::Pending,
        Some("W-OWNER-1"),
    )
    .await;

    // The intruder has their own cart; a hijacked capture must not wipe it.
    app.state
        .services
        .cart
        .add_entry(
            intruder.id,
            AddCartEntryInput {
                product_id: product.id,
                quantity: 1,
                selected_filters: None,
            },
        )
        .await
        .expect("add succeeds");

    let err = app
        .state
        .services
        .checkout
        .capture_wallet_order(intruder.id, "W-OWNER-1")
        .await
        .expect_err("foreign capture is rejected");
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let untouched = order::Entity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .expect("query succeeds")
        .expect("order still exists");
    assert_eq!(untouched.status, OrderStatus::Pending);

    let cart = app
        .state
        .services
        .cart
        .entries(intruder.id)
        .await
        .expect("cart loads");
    assert_eq!(cart.len(), 1, "the intruder's cart survives");
}

#[tokio::test]
async fn replayed_capture_of_settled_order_is_a_noop() {
    let app = spawn_app().await;
    let owner = create_user(&app, UserRole::User).await;

    create_order_with_reference(
        &app,
        owner.id,
        dec!(180.00),
        OrderStatus::Paid,
        Some("W-SETTLED-1"),
    )
    .await;

    // Short-circuits on the stored status; the provider is never contacted.
    let response = app
        .state
        .services
        .checkout
        .capture_wallet_order(owner.id, "W-SETTLED-1")
        .await
        .expect("replay reports the settled state");
    assert_eq!(response.status, OrderStatus::Paid);
}

#[tokio::test]
async fn capture_with_unknown_reference_is_not_found() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;

    let err = app
        .state
        .services
        .checkout
        .capture_wallet_order(user.id, "W-NEVER-CREATED")
        .await
        .expect_err("unknown reference is rejected");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
