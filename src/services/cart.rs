use crate::{
    entities::{cart_entry, product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Cart service. Each user has one implicit cart made of per-product rows;
/// adding an already-carted product replaces its quantity instead of
/// stacking a duplicate row.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddCartEntryInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
    #[serde(default)]
    pub selected_filters: Option<serde_json::Value>,
}

/// One cart line joined with its current catalog data. `unit_price` reflects
/// the catalog now; the authoritative price is captured at checkout.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    pub entry_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub selected_filters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the user's cart, or replaces the quantity and
    /// filter selection when the product is already carted.
    #[instrument(skip(self, input))]
    pub async fn add_entry(
        &self,
        user_id: Uuid,
        input: AddCartEntryInput,
    ) -> Result<cart_entry::Model, ServiceError> {
        input.validate()?;

        // Reject unknown products up front rather than at checkout.
        product::Entity::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let now = Utc::now();
        let existing = cart_entry::Entity::find()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .filter(cart_entry::Column::ProductId.eq(input.product_id))
            .one(&*self.db)
            .await?;

        if let Some(found) = existing {
            let mut active: cart_entry::ActiveModel = found.into();
            active.quantity = Set(input.quantity);
            active.selected_filters = Set(input.selected_filters);
            active.updated_at = Set(now);
            let updated = active.update(&*self.db).await?;

            self.event_sender
                .send_or_log(Event::CartEntryUpdated {
                    user_id,
                    product_id: updated.product_id,
                })
                .await;
            return Ok(updated);
        }

        let created = cart_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(input.product_id),
            quantity: Set(input.quantity),
            selected_filters: Set(input.selected_filters),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::CartEntryAdded {
                user_id,
                product_id: created.product_id,
            })
            .await;
        Ok(created)
    }

    /// Sets the quantity of a carted product. A quantity of zero or less
    /// removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<cart_entry::Model>, ServiceError> {
        if quantity <= 0 {
            self.remove_entry(user_id, product_id).await?;
            return Ok(None);
        }

        let found = cart_entry::Entity::find()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .filter(cart_entry::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not in the cart", product_id))
            })?;

        let mut active: cart_entry::ActiveModel = found.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartEntryUpdated {
                user_id,
                product_id,
            })
            .await;
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    pub async fn remove_entry(&self, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let found = cart_entry::Entity::find()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .filter(cart_entry::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        if let Some(entry) = found {
            entry.delete(&*self.db).await?;
            self.event_sender
                .send_or_log(Event::CartEntryRemoved {
                    user_id,
                    product_id,
                })
                .await;
        }
        Ok(())
    }

    /// Empties the user's cart. Called after a confirmed payment, never as
    /// part of checkout initiation.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = cart_entry::Entity::delete_many()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(%user_id, rows = result.rows_affected, "Cleared cart");
            self.event_sender.send_or_log(Event::CartCleared(user_id)).await;
        }
        Ok(result.rows_affected)
    }

    pub async fn entries(&self, user_id: Uuid) -> Result<Vec<cart_entry::Model>, ServiceError> {
        Ok(cart_entry::Entity::find()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .order_by_asc(cart_entry::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Returns the cart joined with current catalog data. Entries whose
    /// product has since been removed from the catalog are skipped with a
    /// warning rather than failing the whole view.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let rows = cart_entry::Entity::find()
            .filter(cart_entry::Column::UserId.eq(user_id))
            .order_by_asc(cart_entry::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        let mut subtotal = Decimal::ZERO;

        for (entry, maybe_product) in rows {
            let Some(product) = maybe_product else {
                warn!(entry_id = %entry.id, product_id = %entry.product_id, "Skipping cart entry for vanished product");
                continue;
            };
            let line_total = product.price * Decimal::from(entry.quantity);
            subtotal += line_total;
            lines.push(CartLine {
                entry_id: entry.id,
                product_id: product.id,
                title: product.title,
                unit_price: product.price,
                quantity: entry.quantity,
                line_total,
                selected_filters: entry.selected_filters,
            });
        }

        Ok(CartView { lines, subtotal })
    }
}
