mod common;

use common::{create_product, create_user, spawn_app};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_api::{
    entities::{order, order_item, user::UserRole},
    errors::ServiceError,
    services::{cart::AddCartEntryInput, checkout::ShippingAddress},
};

#[tokio::test]
async fn cart_total_is_lines_plus_flat_shipping() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let product = create_product(&app, "Poster", dec!(10.00)).await;

    app.state
        .services
        .cart
        .add_entry(
            user.id,
            AddCartEntryInput {
                product_id: product.id,
                quantity: 2,
                selected_filters: None,
            },
        )
        .await
        .expect("add succeeds");

    let priced = app
        .state
        .services
        .checkout
        .price_cart(user.id)
        .await
        .expect("cart prices");

    assert_eq!(priced.subtotal, dec!(20.00));
    assert_eq!(priced.shipping, dec!(100.00));
    assert_eq!(priced.total, dec!(120.00));
    assert_eq!(priced.currency, "USD");
    assert_eq!(priced.lines.len(), 1);
    assert_eq!(priced.lines[0].unit_price, dec!(10.00));
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;

    let err = app
        .state
        .services
        .checkout
        .price_cart(user.id)
        .await
        .expect_err("empty cart is rejected");

    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn pricing_uses_current_catalog_prices() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let product = create_product(&app, "Chair", dec!(50.00)).await;

    app.state
        .services
        .cart
        .add_entry(
            user.id,
            AddCartEntryInput {
                product_id: product.id,
                quantity: 1,
                selected_filters: None,
            },
        )
        .await
        .expect("add succeeds");

    app.state
        .services
        .products
        .update_product(
            product.id,
            storefront_api::services::products::UpdateProductInput {
                title: None,
                description: None,
                category: None,
                price: Some(dec!(60.00)),
                image_urls: None,
                featured: None,
                banner: None,
                filters: None,
            },
        )
        .await
        .expect("price update succeeds");

    let priced = app
        .state
        .services
        .checkout
        .price_cart(user.id)
        .await
        .expect("cart prices");

    assert_eq!(priced.subtotal, dec!(60.00));
    assert_eq!(priced.total, dec!(160.00));
}

#[tokio::test]
async fn pending_order_snapshots_one_item_per_line() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let poster = create_product(&app, "Poster", dec!(10.00)).await;
    let chair = create_product(&app, "Chair", dec!(50.00)).await;
    let cart = &app.state.services.cart;

    for (product_id, quantity) in [(poster.id, 2), (chair.id, 1)] {
        cart.add_entry(
            user.id,
            AddCartEntryInput {
                product_id,
                quantity,
                selected_filters: None,
            },
        )
        .await
        .expect("add succeeds");
    }

    let checkout = &app.state.services.checkout;
    let priced = checkout.price_cart(user.id).await.expect("cart prices");
    let created = checkout
        .create_pending_order(user.id, &priced, None, None)
        .await
        .expect("pending order created");

    assert_eq!(created.status, order::OrderStatus::Pending);
    assert_eq!(created.total_amount, dec!(170.00));

    let order_count = order::Entity::find()
        .filter(order::Column::UserId.eq(user.id))
        .count(&*app.state.db)
        .await
        .expect("count succeeds");
    assert_eq!(order_count, 1);

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(created.id))
        .all(&*app.state.db)
        .await
        .expect("items load");
    assert_eq!(items.len(), 2);

    let poster_item = items
        .iter()
        .find(|i| i.product_id == poster.id)
        .expect("poster line present");
    assert_eq!(poster_item.quantity, 2);
    assert_eq!(poster_item.unit_price, dec!(10.00));
    assert_eq!(poster_item.line_total, dec!(20.00));
}

#[tokio::test]
async fn shipping_address_is_stored_on_the_order() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let product = create_product(&app, "Lamp", dec!(30.00)).await;

    app.state
        .services
        .cart
        .add_entry(
            user.id,
            AddCartEntryInput {
                product_id: product.id,
                quantity: 1,
                selected_filters: None,
            },
        )
        .await
        .expect("add succeeds");

    let address = ShippingAddress {
        name: "Ada Lovelace".to_string(),
        line1: "12 Analytical Row".to_string(),
        line2: None,
        city: "London".to_string(),
        postal_code: "EC1A 1BB".to_string(),
    };

    let checkout = &app.state.services.checkout;
    let priced = checkout.price_cart(user.id).await.expect("cart prices");
    let created = checkout
        .create_pending_order(user.id, &priced, None, Some(&address))
        .await
        .expect("pending order created");

    let stored = created.shipping_address.expect("address persisted");
    assert_eq!(stored["name"], "Ada Lovelace");
    assert_eq!(stored["city"], "London");
}
