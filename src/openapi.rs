use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_entry,
        crate::handlers::carts::update_entry,
        crate::handlers::carts::remove_entry,
        crate::handlers::carts::clear_cart,
        crate::handlers::checkout::quote,
        crate::handlers::checkout::start_card_checkout,
        crate::handlers::checkout::start_wallet_checkout,
        crate::handlers::checkout::capture_wallet_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_my_order,
        crate::handlers::orders::list_all_orders,
        crate::handlers::orders::get_any_order,
        crate::handlers::orders::update_tracking,
        crate::handlers::users::get_me,
        crate::handlers::users::list_users,
        crate::handlers::chat::get_my_thread,
        crate::handlers::chat::post_to_my_thread,
        crate::handlers::chat::list_threads,
        crate::handlers::chat::get_thread,
        crate::handlers::chat::reply_to_thread,
        crate::handlers::chat::mark_thread_read,
        crate::handlers::webhooks::payment_webhook,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::user::Model,
        crate::entities::user::UserRole,
        crate::entities::product::Model,
        crate::entities::order::Model,
        crate::entities::order::OrderStatus,
        crate::entities::order_item::Model,
        crate::entities::cart_entry::Model,
        crate::entities::chat_message::Model,
        crate::entities::chat_message::ChatSender,
        crate::services::products::CreateProductInput,
        crate::services::products::UpdateProductInput,
        crate::services::cart::AddCartEntryInput,
        crate::services::cart::CartLine,
        crate::services::cart::CartView,
        crate::services::checkout::PricedLine,
        crate::services::checkout::PricedCart,
        crate::services::checkout::ShippingAddress,
        crate::services::checkout::CardCheckoutInput,
        crate::services::checkout::CardCheckoutResponse,
        crate::services::checkout::WalletCheckoutInput,
        crate::services::checkout::WalletCheckoutResponse,
        crate::services::checkout::WalletCaptureInput,
        crate::services::checkout::WalletCaptureResponse,
        crate::services::orders::OrderWithItems,
        crate::services::orders::UpdateTrackingInput,
        crate::services::chat::PostMessageInput,
        crate::services::chat::ThreadSummary,
        crate::handlers::carts::UpdateQuantityRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Products", description = "Public catalog browsing"),
        (name = "Cart", description = "Per-user shopping cart"),
        (name = "Checkout", description = "Checkout initiation and wallet capture"),
        (name = "Orders", description = "Customer order history and tracking"),
        (name = "Payments", description = "Payment provider callbacks"),
        (name = "Chat", description = "Customer support chat"),
        (name = "Users", description = "Account endpoints"),
        (name = "Admin", description = "Back-office operations"),
    ),
    info(
        title = "Storefront API",
        description = "Direct-to-consumer storefront backend: catalog, carts, checkout via two payment providers, order tracking, and support chat.",
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
