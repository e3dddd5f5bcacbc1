use crate::{
    config::AppConfig,
    entities::{
        cart_entry,
        order::{self, OrderStatus},
        order_item, product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{
        reconciliation::{OrderLookup, TransitionIntent},
        CardGateway, WalletGateway,
    },
    services::{cart::CartService, orders::{OrderService, TransitionOutcome}},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Checkout orchestration: prices the cart from the current catalog, creates
/// the pending order with captured line prices, and hands off to one of the
/// two payment providers. Settlement happens later, via webhook for card
/// checkouts and via the capture call for wallet checkouts.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    card: Arc<CardGateway>,
    wallet: Arc<WalletGateway>,
    orders: OrderService,
    cart: CartService,
}

/// A cart line priced against the catalog at checkout time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
}

impl PricedCart {
    /// Builds the totals from priced lines plus the flat shipping surcharge.
    pub fn from_lines(lines: Vec<PricedLine>, shipping: Decimal, currency: String) -> Self {
        let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
        let total = subtotal + shipping;
        Self {
            lines,
            subtotal,
            shipping,
            total,
            currency,
        }
    }
}

/// Delivery address captured with the order at checkout time. Stored as a
/// JSON snapshot on the order; later edits to an account never rewrite
/// where a placed order ships.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
}

/// Body of a card checkout initiation. The cart itself is read server-side;
/// only delivery details travel with the request.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CardCheckoutInput {
    #[validate]
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

/// Response to a card checkout initiation: where to send the shopper.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CardCheckoutResponse {
    pub order_id: Uuid,
    pub session_id: String,
    pub redirect_url: String,
}

/// Direct wallet purchase of a single product, bypassing the cart.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct WalletCheckoutInput {
    pub product_id: Option<Uuid>,
    #[validate(range(min = 1, max = 999))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletCheckoutResponse {
    pub order_id: Uuid,
    pub provider_order_id: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WalletCaptureInput {
    pub provider_order_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletCaptureResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        card: Arc<CardGateway>,
        wallet: Arc<WalletGateway>,
        orders: OrderService,
        cart: CartService,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            card,
            wallet,
            orders,
            cart,
        }
    }

    /// Prices the user's cart against the current catalog. Entries whose
    /// product no longer exists are skipped with a warning; an empty result
    /// is an error since there is nothing to pay for.
    #[instrument(skip(self))]
    pub async fn price_cart(&self, user_id: Uuid) -> Result<PricedCart, ServiceError> {
        let rows = cart_entry::Entity::find()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .order_by_asc(cart_entry::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (entry, maybe_product) in rows {
            let Some(product) = maybe_product else {
                warn!(product_id = %entry.product_id, "Skipping unpriceable cart entry");
                continue;
            };
            lines.push(PricedLine {
                product_id: product.id,
                title: product.title,
                unit_price: product.price,
                quantity: entry.quantity,
                line_total: product.price * Decimal::from(entry.quantity),
            });
        }

        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "cart is empty; nothing to check out".to_string(),
            ));
        }

        Ok(PricedCart::from_lines(
            lines,
            self.config.shipping_surcharge(),
            self.config.currency.clone(),
        ))
    }

    /// Creates the pending order and its line items in one transaction.
    /// Prices are captured here; later catalog edits never change the total.
    pub async fn create_pending_order(
        &self,
        user_id: Uuid,
        priced: &PricedCart,
        direct_product_id: Option<Uuid>,
        shipping_address: Option<&ShippingAddress>,
    ) -> Result<order::Model, ServiceError> {
        let shipping = match shipping_address {
            Some(addr) => Some(serde_json::to_value(addr).map_err(|e| {
                ServiceError::InternalError(format!("unserializable shipping address: {}", e))
            })?),
            None => None,
        };

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let created = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            product_id: Set(direct_product_id),
            total_amount: Set(priced.total),
            currency: Set(priced.currency.clone()),
            status: Set(OrderStatus::Pending),
            tracking_number: Set(None),
            payment_reference: Set(None),
            shipping_address: Set(shipping),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        for line in &priced.lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                title: Set(line.title.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                line_total: Set(line.line_total),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(%order_id, total = %priced.total, "Created pending order");
        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;
        Ok(created)
    }

    /// Card checkout: price the cart, create the pending order, open a
    /// hosted-checkout session carrying the order id in its metadata. The
    /// cart is left untouched; only the completion webhook clears it.
    #[instrument(skip(self, input))]
    pub async fn start_card_checkout(
        &self,
        user_id: Uuid,
        input: CardCheckoutInput,
    ) -> Result<CardCheckoutResponse, ServiceError> {
        input.validate()?;

        let priced = self.price_cart(user_id).await?;
        let order = self
            .create_pending_order(user_id, &priced, None, input.shipping_address.as_ref())
            .await?;

        let description = match priced.lines.as_slice() {
            [only] => only.title.clone(),
            lines => format!("Order of {} items", lines.len()),
        };

        let session = self
            .card
            .create_checkout_session(order.id, priced.total, &priced.currency, &description)
            .await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                order_id: order.id,
                session_id: session.id.clone(),
            })
            .await;

        Ok(CardCheckoutResponse {
            order_id: order.id,
            session_id: session.id,
            redirect_url: session.url,
        })
    }

    /// Wallet checkout: creates the pending order locally, then mirrors it
    /// on the wallet provider with our order id as the reference. Supports
    /// either the whole cart or a direct single-product purchase.
    #[instrument(skip(self, input))]
    pub async fn start_wallet_checkout(
        &self,
        user_id: Uuid,
        input: WalletCheckoutInput,
    ) -> Result<WalletCheckoutResponse, ServiceError> {
        input.validate()?;

        let (priced, direct_product_id) = match input.product_id {
            Some(product_id) => {
                let product = product::Entity::find_by_id(product_id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", product_id))
                    })?;
                let line = PricedLine {
                    product_id: product.id,
                    title: product.title.clone(),
                    unit_price: product.price,
                    quantity: input.quantity,
                    line_total: product.price * Decimal::from(input.quantity),
                };
                (
                    PricedCart::from_lines(
                        vec![line],
                        self.config.shipping_surcharge(),
                        self.config.currency.clone(),
                    ),
                    Some(product_id),
                )
            }
            None => (self.price_cart(user_id).await?, None),
        };

        let order = self
            .create_pending_order(user_id, &priced, direct_product_id, None)
            .await?;

        let provider_order = self
            .wallet
            .create_order(order.id, priced.total, &priced.currency)
            .await?;

        // The provider order id is kept on the order so the capture call can
        // resolve and authorize it before touching the provider again.
        let mut pending: order::ActiveModel = order.clone().into();
        pending.payment_reference = Set(Some(provider_order.id.clone()));
        pending.updated_at = Set(Some(Utc::now()));
        pending.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::WalletOrderCreated {
                order_id: order.id,
                provider_order_id: provider_order.id.clone(),
            })
            .await;

        Ok(WalletCheckoutResponse {
            order_id: order.id,
            provider_order_id: provider_order.id,
        })
    }

    /// Captures an approved wallet order. The provider order id is resolved
    /// to the local order first, so a caller can only settle their own
    /// orders and a replay short-circuits before the provider is contacted.
    /// On a COMPLETED outcome the order is marked paid and its owner's cart
    /// cleared, otherwise it stays pending and the shopper is told the
    /// payment did not go through.
    #[instrument(skip(self))]
    pub async fn capture_wallet_order(
        &self,
        user_id: Uuid,
        provider_order_id: &str,
    ) -> Result<WalletCaptureResponse, ServiceError> {
        let order = order::Entity::find()
            .filter(order::Column::PaymentReference.eq(provider_order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No order for wallet reference {}",
                    provider_order_id
                ))
            })?;

        if order.user_id != user_id {
            warn!(order_id = %order.id, "Capture attempted for another account's order");
            return Err(ServiceError::Forbidden(
                "order belongs to another account".to_string(),
            ));
        }

        // Replay of an already-settled capture; nothing to send the provider.
        if order.status != OrderStatus::Pending {
            return Ok(WalletCaptureResponse {
                order_id: order.id,
                status: order.status,
            });
        }

        let outcome = self.wallet.capture_order(provider_order_id).await?;

        if !outcome.is_completed() {
            warn!(%provider_order_id, status = %outcome.status, "Wallet capture not completed; order stays pending");
            return Err(ServiceError::PaymentFailed(format!(
                "wallet capture returned {}",
                outcome.status
            )));
        }

        let referenced = outcome
            .reference_id
            .as_deref()
            .and_then(|r| Uuid::parse_str(r).ok())
            .ok_or_else(|| {
                ServiceError::ExternalServiceError(
                    "capture response missing usable order reference".to_string(),
                )
            })?;
        if referenced != order.id {
            return Err(ServiceError::ExternalServiceError(format!(
                "capture settled order {} but {} was requested",
                referenced, order.id
            )));
        }

        info!(order_id = %order.id, capture_id = ?outcome.capture_id, "Wallet capture completed");

        let intent = TransitionIntent {
            lookup: OrderLookup::ById(order.id),
            target: OrderStatus::Paid,
            payment_reference: None,
            clear_cart_on_apply: true,
        };

        match self.orders.apply_transition(&intent).await? {
            TransitionOutcome::Applied(updated) => {
                // Direct purchases never touched the cart, so there is
                // nothing to clear for them. The settled order's owner is
                // the cart that gets emptied.
                if updated.product_id.is_none() {
                    self.cart.clear_cart(updated.user_id).await?;
                }
                self.event_sender
                    .send_or_log(Event::WalletOrderCaptured { order_id: updated.id })
                    .await;
                Ok(WalletCaptureResponse {
                    order_id: updated.id,
                    status: updated.status,
                })
            }
            TransitionOutcome::AlreadySettled(existing) => Ok(WalletCaptureResponse {
                order_id: existing.id,
                status: existing.status,
            }),
            TransitionOutcome::NotFound => Err(ServiceError::NotFound(format!(
                "Order {} referenced by capture not found",
                order.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, quantity: i32) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            title: "Widget".to_string(),
            unit_price: price,
            quantity,
            line_total: price * Decimal::from(quantity),
        }
    }

    #[test]
    fn totals_add_flat_shipping_once() {
        let priced = PricedCart::from_lines(
            vec![line(dec!(10.00), 2)],
            dec!(100.00),
            "USD".to_string(),
        );
        assert_eq!(priced.subtotal, dec!(20.00));
        assert_eq!(priced.total, dec!(120.00));
    }

    #[test]
    fn shipping_applies_even_for_multiple_lines() {
        let priced = PricedCart::from_lines(
            vec![line(dec!(10.00), 1), line(dec!(5.50), 3)],
            dec!(100.00),
            "USD".to_string(),
        );
        assert_eq!(priced.subtotal, dec!(26.50));
        assert_eq!(priced.total, dec!(126.50));
    }
}
