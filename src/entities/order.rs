use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Purchase record. Created in `Pending` at checkout initiation and
/// transitioned by payment-provider callbacks or capture responses.
/// `product_id` is set only on the legacy single-item wallet path;
/// cart checkouts carry their lines in `order_items`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Order)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(nullable)]
    pub product_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    #[sea_orm(nullable)]
    pub tracking_number: Option<String>,
    /// Provider-side reference: the card provider's payment intent, or the
    /// wallet provider's order id set when the wallet order is mirrored
    #[sea_orm(nullable)]
    pub payment_reference: Option<String>,
    /// Shopper-supplied delivery address captured at checkout
    #[sea_orm(column_type = "Json", nullable)]
    pub shipping_address: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle states. Closed enum; `Delivered` and `Failed` are
/// terminal, `Failed` is reachable only from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "SHIPPED")]
    Shipped,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl OrderStatus {
    /// Whether a transition from `self` to `next` is allowed. Paid orders
    /// only move forward; Failed is a dead end off Pending.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Failed)
                | (Paid, Shipped)
                | (Paid, Delivered)
                | (Shipped, Delivered)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn paid_never_regresses() {
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Failed));
        assert!(Paid.can_transition_to(Shipped));
        assert!(Paid.can_transition_to(Delivered));
    }

    #[test]
    fn failed_only_from_pending() {
        assert!(Pending.can_transition_to(Failed));
        assert!(!Shipped.can_transition_to(Failed));
        assert!(!Delivered.can_transition_to(Failed));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in [Pending, Paid, Shipped, Delivered, Failed] {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
    }
}
