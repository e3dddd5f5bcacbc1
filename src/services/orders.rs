use crate::{
    entities::{
        order::{self, OrderStatus},
        order_item, user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    payments::reconciliation::{OrderLookup, TransitionIntent},
    services::email::EmailService,
};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order read-side and lifecycle service. All status changes flow through
/// [`OrderService::apply_transition`], which performs a compare-and-set
/// against the current status so concurrent or replayed callbacks settle an
/// order at most once.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    email: Arc<EmailService>,
}

/// Result of attempting a conditional status transition.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The guarded update matched and the order moved to the target status.
    Applied(order::Model),
    /// The order was already past the source status; nothing was mutated.
    AlreadySettled(order::Model),
    /// No order matched the lookup.
    NotFound,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTrackingInput {
    pub status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
}

/// Admin order listing filters.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Whether a tracking update actually changes the stored tracking number.
/// Notification is keyed off this so resubmitting the same form never
/// re-sends the email.
pub fn tracking_changed(previous: Option<&str>, incoming: Option<&str>) -> bool {
    match incoming {
        Some(new) => previous != Some(new),
        None => false,
    }
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        email: Arc<EmailService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            email,
        }
    }

    async fn find_by_lookup(
        &self,
        lookup: &OrderLookup,
    ) -> Result<Option<order::Model>, ServiceError> {
        let found = match lookup {
            OrderLookup::ById(id) => order::Entity::find_by_id(*id).one(&*self.db).await?,
            OrderLookup::ByPaymentReference(reference) => {
                order::Entity::find()
                    .filter(order::Column::PaymentReference.eq(reference.clone()))
                    .one(&*self.db)
                    .await?
            }
        };
        Ok(found)
    }

    /// Applies a reconciliation transition with a status guard: the UPDATE
    /// only matches while the order still sits in its observed status, so a
    /// replayed or racing callback finds zero rows and reports
    /// `AlreadySettled` instead of mutating twice.
    #[instrument(skip(self, intent), fields(target = ?intent.target))]
    pub async fn apply_transition(
        &self,
        intent: &TransitionIntent,
    ) -> Result<TransitionOutcome, ServiceError> {
        let Some(current) = self.find_by_lookup(&intent.lookup).await? else {
            return Ok(TransitionOutcome::NotFound);
        };

        if !current.status.can_transition_to(intent.target) {
            info!(
                order_id = %current.id,
                status = ?current.status,
                target = ?intent.target,
                "Transition not applicable; order already settled"
            );
            return Ok(TransitionOutcome::AlreadySettled(current));
        }

        let mut patch = order::ActiveModel {
            status: Set(intent.target),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        if let Some(reference) = &intent.payment_reference {
            patch.payment_reference = Set(Some(reference.clone()));
        }

        let result = order::Entity::update_many()
            .set(patch)
            .filter(order::Column::Id.eq(current.id))
            .filter(order::Column::Status.eq(current.status))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            // Lost the race to a concurrent transition; report current state.
            let settled = order::Entity::find_by_id(current.id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Order {} not found", current.id))
                })?;
            return Ok(TransitionOutcome::AlreadySettled(settled));
        }

        let updated = order::Entity::find_by_id(current.id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", current.id)))?;

        info!(order_id = %updated.id, from = ?current.status, to = ?updated.status, "Order transitioned");
        match updated.status {
            OrderStatus::Paid => {
                self.event_sender.send_or_log(Event::OrderPaid(updated.id)).await;
            }
            OrderStatus::Failed => {
                self.event_sender.send_or_log(Event::OrderFailed(updated.id)).await;
            }
            _ => {
                self.event_sender
                    .send_or_log(Event::OrderStatusChanged {
                        order_id: updated.id,
                        old_status: format!("{:?}", current.status),
                        new_status: format!("{:?}", updated.status),
                    })
                    .await;
            }
        }

        Ok(TransitionOutcome::Applied(updated))
    }

    /// Back-office fulfilment update: moves a paid order through
    /// `Shipped`/`Delivered` and records the carrier tracking number. The
    /// customer is emailed once per actual tracking change; email failures
    /// are logged, never surfaced, since the order update already happened.
    #[instrument(skip(self, input))]
    pub async fn update_tracking(
        &self,
        order_id: Uuid,
        input: UpdateTrackingInput,
    ) -> Result<order::Model, ServiceError> {
        let current = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(target) = input.status {
            if !matches!(target, OrderStatus::Shipped | OrderStatus::Delivered) {
                return Err(ServiceError::InvalidOperation(
                    "fulfilment can only set SHIPPED or DELIVERED".to_string(),
                ));
            }
            if target != current.status && !current.status.can_transition_to(target) {
                return Err(ServiceError::InvalidOperation(format!(
                    "cannot move order from {:?} to {:?}",
                    current.status, target
                )));
            }
        }

        let notify = tracking_changed(
            current.tracking_number.as_deref(),
            input.tracking_number.as_deref(),
        );

        let mut patch = order::ActiveModel {
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        if let Some(target) = input.status {
            patch.status = Set(target);
        }
        if let Some(tracking) = &input.tracking_number {
            patch.tracking_number = Set(Some(tracking.clone()));
        }

        let result = order::Entity::update_many()
            .set(patch)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(current.status))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(
                "order changed concurrently; retry the update".to_string(),
            ));
        }

        let updated = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(target) = input.status {
            if target != current.status {
                self.event_sender
                    .send_or_log(Event::OrderStatusChanged {
                        order_id,
                        old_status: format!("{:?}", current.status),
                        new_status: format!("{:?}", target),
                    })
                    .await;
            }
        }

        if notify {
            let tracking = updated.tracking_number.clone().unwrap_or_default();
            self.event_sender
                .send_or_log(Event::TrackingUpdated {
                    order_id,
                    tracking_number: tracking.clone(),
                })
                .await;

            match user::Entity::find_by_id(updated.user_id).one(&*self.db).await {
                Ok(Some(recipient)) if !recipient.email.is_empty() => {
                    if let Err(e) = self
                        .email
                        .send_tracking_update(&recipient.email, &updated, &tracking)
                        .await
                    {
                        warn!(%order_id, "Tracking email failed: {}", e);
                    }
                }
                Ok(_) => warn!(%order_id, "No recipient email for tracking update"),
                Err(e) => warn!(%order_id, "Recipient lookup failed: {}", e),
            }
        }

        Ok(updated)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let found = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.with_items(found).await
    }

    /// Fetches an order scoped to its owner. Other users get `NotFound`
    /// rather than `Forbidden` so order ids are not probeable.
    pub async fn get_order_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let found = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.with_items(found).await
    }

    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(orders.len());
        for order in orders {
            out.push(self.with_items(order).await?);
        }
        Ok(out)
    }

    /// Back-office listing across all users, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        query: OrderQuery,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut find = order::Entity::find();
        if let Some(status) = query.status {
            find = find.filter(order::Column::Status.eq(status));
        }
        if let Some(user_id) = query.user_id {
            find = find.filter(order::Column::UserId.eq(user_id));
        }

        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let page = query.page.unwrap_or(1).max(1);

        let paginator = find
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;
        Ok((orders, total))
    }

    async fn with_items(&self, order: order::Model) -> Result<OrderWithItems, ServiceError> {
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }
}

#[cfg(test)]
mod tests {
    use super::tracking_changed;

    #[test]
    fn no_tracking_submitted_never_notifies() {
        assert!(!tracking_changed(None, None));
        assert!(!tracking_changed(Some("TRK-1"), None));
    }

    #[test]
    fn new_or_changed_tracking_notifies() {
        assert!(tracking_changed(None, Some("TRK-1")));
        assert!(tracking_changed(Some("TRK-1"), Some("TRK-2")));
    }

    #[test]
    fn resubmitting_same_tracking_does_not_notify() {
        assert!(!tracking_changed(Some("TRK-1"), Some("TRK-1")));
    }
}
