mod common;

use common::{create_order, create_user, spawn_app};
use rust_decimal_macros::dec;
use storefront_api::{
    entities::{order::OrderStatus, user::UserRole},
    errors::ServiceError,
    services::orders::UpdateTrackingInput,
};

#[tokio::test]
async fn paid_order_can_be_shipped_with_tracking() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(120.00), OrderStatus::Paid).await;

    let updated = app
        .state
        .services
        .orders
        .update_tracking(
            order.id,
            UpdateTrackingInput {
                status: Some(OrderStatus::Shipped),
                tracking_number: Some("TRK-12345".to_string()),
            },
        )
        .await
        .expect("shipment update succeeds");

    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.tracking_number.as_deref(), Some("TRK-12345"));
    assert_eq!(updated.total_amount, dec!(120.00));
}

#[tokio::test]
async fn pending_order_cannot_be_shipped() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(40.00), OrderStatus::Pending).await;

    let err = app
        .state
        .services
        .orders
        .update_tracking(
            order.id,
            UpdateTrackingInput {
                status: Some(OrderStatus::Shipped),
                tracking_number: Some("TRK-1".to_string()),
            },
        )
        .await
        .expect_err("unpaid orders cannot ship");

    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn fulfilment_cannot_set_non_shipping_states() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(40.00), OrderStatus::Paid).await;

    for target in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Failed] {
        let err = app
            .state
            .services
            .orders
            .update_tracking(
                order.id,
                UpdateTrackingInput {
                    status: Some(target),
                    tracking_number: None,
                },
            )
            .await
            .expect_err("only SHIPPED/DELIVERED are allowed");
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }
}

#[tokio::test]
async fn shipped_order_can_be_delivered() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(80.00), OrderStatus::Shipped).await;

    let updated = app
        .state
        .services
        .orders
        .update_tracking(
            order.id,
            UpdateTrackingInput {
                status: Some(OrderStatus::Delivered),
                tracking_number: None,
            },
        )
        .await
        .expect("delivery update succeeds");

    assert_eq!(updated.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn resubmitting_same_tracking_is_idempotent() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(90.00), OrderStatus::Paid).await;
    let orders = &app.state.services.orders;

    let input = UpdateTrackingInput {
        status: Some(OrderStatus::Shipped),
        tracking_number: Some("TRK-7".to_string()),
    };
    orders
        .update_tracking(order.id, input.clone())
        .await
        .expect("first update succeeds");

    // Same form resubmitted: status already SHIPPED, tracking unchanged.
    let updated = orders
        .update_tracking(order.id, input)
        .await
        .expect("resubmit succeeds");

    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.tracking_number.as_deref(), Some("TRK-7"));
}
