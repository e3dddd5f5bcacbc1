mod common;

use common::{create_order, create_product, create_user, spawn_app};
use rust_decimal_macros::dec;
use storefront_api::{
    entities::{order::OrderStatus, user::UserRole},
    payments::reconciliation::{parse_event, reconcile, CheckoutEvent, OrderLookup, TransitionIntent},
    services::{cart::AddCartEntryInput, orders::TransitionOutcome},
};
use uuid::Uuid;

fn paid_intent(order_id: Uuid, reference: &str) -> TransitionIntent {
    TransitionIntent {
        lookup: OrderLookup::ById(order_id),
        target: OrderStatus::Paid,
        payment_reference: Some(reference.to_string()),
        clear_cart_on_apply: true,
    }
}

#[tokio::test]
async fn completed_session_settles_pending_order() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(120.00), OrderStatus::Pending).await;

    let outcome = app
        .state
        .services
        .orders
        .apply_transition(&paid_intent(order.id, "pi_123"))
        .await
        .expect("transition applies");

    let TransitionOutcome::Applied(updated) = outcome else {
        panic!("expected Applied, got {:?}", outcome);
    };
    assert_eq!(updated.status, OrderStatus::Paid);
    assert_eq!(updated.payment_reference.as_deref(), Some("pi_123"));
    assert_eq!(updated.total_amount, dec!(120.00));
}

#[tokio::test]
async fn replayed_completion_is_a_noop() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(50.00), OrderStatus::Pending).await;
    let orders = &app.state.services.orders;

    let first = orders
        .apply_transition(&paid_intent(order.id, "pi_123"))
        .await
        .expect("first application");
    assert!(matches!(first, TransitionOutcome::Applied(_)));

    let second = orders
        .apply_transition(&paid_intent(order.id, "pi_123"))
        .await
        .expect("replay does not error");

    let TransitionOutcome::AlreadySettled(settled) = second else {
        panic!("expected AlreadySettled, got {:?}", second);
    };
    assert_eq!(settled.status, OrderStatus::Paid);
    assert_eq!(settled.total_amount, dec!(50.00));
}

#[tokio::test]
async fn replayed_completion_leaves_rebuilt_cart_alone() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let product = create_product(&app, "Rug", dec!(40.00)).await;
    let order = create_order(&app, user.id, dec!(140.00), OrderStatus::Pending).await;
    let orders = &app.state.services.orders;
    let cart = &app.state.services.cart;

    let intent = paid_intent(order.id, "pi_abc");
    let first = orders.apply_transition(&intent).await.expect("applies");
    if let TransitionOutcome::Applied(o) = &first {
        // First application clears the cart, as the webhook handler would.
        cart.clear_cart(o.user_id).await.expect("clear succeeds");
    } else {
        panic!("expected Applied");
    }

    // Shopper starts a new cart after paying.
    cart.add_entry(
        user.id,
        AddCartEntryInput {
            product_id: product.id,
            quantity: 1,
            selected_filters: None,
        },
    )
    .await
    .expect("new cart entry");

    // Replay: transition does not apply, so the handler never clears again.
    let replay = orders.apply_transition(&intent).await.expect("replay ok");
    assert!(matches!(replay, TransitionOutcome::AlreadySettled(_)));

    let view = cart.get_cart(user.id).await.expect("cart loads");
    assert_eq!(view.lines.len(), 1, "rebuilt cart must survive the replay");
}

#[tokio::test]
async fn expiry_after_payment_cannot_regress_the_order() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(75.00), OrderStatus::Paid).await;

    let intent = TransitionIntent {
        lookup: OrderLookup::ById(order.id),
        target: OrderStatus::Failed,
        payment_reference: None,
        clear_cart_on_apply: false,
    };

    let outcome = app
        .state
        .services
        .orders
        .apply_transition(&intent)
        .await
        .expect("late expiry does not error");

    let TransitionOutcome::AlreadySettled(settled) = outcome else {
        panic!("expected AlreadySettled, got {:?}", outcome);
    };
    assert_eq!(settled.status, OrderStatus::Paid);
}

#[tokio::test]
async fn unknown_order_mutates_nothing() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = create_order(&app, user.id, dec!(30.00), OrderStatus::Pending).await;

    let outcome = app
        .state
        .services
        .orders
        .apply_transition(&paid_intent(Uuid::new_v4(), "pi_zzz"))
        .await
        .expect("unknown order does not error");
    assert!(matches!(outcome, TransitionOutcome::NotFound));

    let untouched = app
        .state
        .services
        .orders
        .get_order(order.id)
        .await
        .expect("existing order still loads");
    assert_eq!(untouched.order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn failure_event_fails_order_via_payment_reference() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let order = common::create_order_with_reference(
        &app,
        user.id,
        dec!(60.00),
        OrderStatus::Pending,
        Some("pi_fail"),
    )
    .await;

    let event = parse_event(&serde_json::json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_fail" } }
    }))
    .expect("failure event parses");
    assert!(matches!(event, CheckoutEvent::PaymentFailed { .. }));

    let intent = reconcile(event).expect("failure implies a transition");
    let outcome = app
        .state
        .services
        .orders
        .apply_transition(&intent)
        .await
        .expect("reference lookup works");

    let TransitionOutcome::Applied(failed) = outcome else {
        panic!("expected Applied, got {:?}", outcome);
    };
    assert_eq!(failed.id, order.id);
    assert_eq!(failed.status, OrderStatus::Failed);
}
