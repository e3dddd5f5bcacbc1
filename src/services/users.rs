use crate::{
    entities::user::{self, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const ACTIVE: &str = "ACTIVE";

/// Account service. Accounts mirror the external identity provider: rows are
/// created lazily on first sight of a subject and kept in sync afterwards.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Resolves an identity-provider subject to a local account, creating
    /// the row on first sign-in and refreshing profile fields on later ones.
    #[instrument(skip(self))]
    pub async fn upsert_from_identity(
        &self,
        external_subject: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<user::Model, ServiceError> {
        let existing = user::Entity::find()
            .filter(user::Column::ExternalSubject.eq(external_subject))
            .one(&*self.db)
            .await?;

        let now = Utc::now();

        if let Some(found) = existing {
            let profile_changed = email.map_or(false, |e| e != found.email)
                || display_name.map_or(false, |n| n != found.display_name);

            let mut active: user::ActiveModel = found.into();
            if let Some(e) = email {
                active.email = Set(e.to_string());
            }
            if let Some(n) = display_name {
                active.display_name = Set(n.to_string());
            }
            active.last_active_at = Set(now);
            active.updated_at = Set(Some(now));
            let updated = active.update(&*self.db).await?;

            if profile_changed {
                self.event_sender
                    .send_or_log(Event::UserProfileSynced(updated.id))
                    .await;
            }
            return Ok(updated);
        }

        let user_id = Uuid::new_v4();
        let created = user::ActiveModel {
            id: Set(user_id),
            external_subject: Set(external_subject.to_string()),
            email: Set(email.unwrap_or_default().to_string()),
            display_name: Set(display_name.unwrap_or_default().to_string()),
            role: Set(UserRole::User),
            status: Set(ACTIVE.to_string()),
            last_active_at: Set(now),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = %created.id, "Created account for new identity subject");
        self.event_sender
            .send_or_log(Event::UserSignedIn(created.id))
            .await;

        Ok(created)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// Lists accounts for the back office, newest sign-up first.
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let paginator = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db, per_page.clamp(1, 100));

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }
}
