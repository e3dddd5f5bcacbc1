use crate::{
    entities::{
        chat_message::{self, ChatSender},
        user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Support chat. Every end user has one thread, keyed by their user id;
/// admin replies land in the same thread. Read state exists only on the
/// admin side, to surface threads that still need a reply.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PostMessageInput {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

/// Back-office inbox row: one per thread, newest activity first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ThreadSummary {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub last_message: String,
    pub last_sender: ChatSender,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u64,
}

impl ChatService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Posts a message into a thread. Admin messages are born read; user
    /// messages wait for an admin to open the thread.
    #[instrument(skip(self, input))]
    pub async fn post_message(
        &self,
        thread_user_id: Uuid,
        sender: ChatSender,
        input: PostMessageInput,
    ) -> Result<chat_message::Model, ServiceError> {
        input.validate()?;

        let created = chat_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(thread_user_id),
            sender: Set(sender),
            content: Set(input.content),
            read_by_admin: Set(sender == ChatSender::Admin),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ChatMessagePosted {
                user_id: thread_user_id,
                message_id: created.id,
            })
            .await;
        Ok(created)
    }

    /// Returns a thread's messages oldest-first.
    #[instrument(skip(self))]
    pub async fn list_thread(
        &self,
        thread_user_id: Uuid,
    ) -> Result<Vec<chat_message::Model>, ServiceError> {
        Ok(chat_message::Entity::find()
            .filter(chat_message::Column::UserId.eq(thread_user_id))
            .order_by_asc(chat_message::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Back-office inbox: one summary per thread with the latest message
    /// and the count of user messages no admin has read yet.
    #[instrument(skip(self))]
    pub async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ServiceError> {
        let thread_ids: Vec<Uuid> = chat_message::Entity::find()
            .select_only()
            .column(chat_message::Column::UserId)
            .distinct()
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut summaries = Vec::with_capacity(thread_ids.len());
        for thread_user_id in thread_ids {
            let Some(last) = chat_message::Entity::find()
                .filter(chat_message::Column::UserId.eq(thread_user_id))
                .order_by_desc(chat_message::Column::CreatedAt)
                .one(&*self.db)
                .await?
            else {
                continue;
            };

            let unread_count = chat_message::Entity::find()
                .filter(chat_message::Column::UserId.eq(thread_user_id))
                .filter(chat_message::Column::Sender.eq(ChatSender::User))
                .filter(chat_message::Column::ReadByAdmin.eq(false))
                .count(&*self.db)
                .await?;

            let account = user::Entity::find_by_id(thread_user_id).one(&*self.db).await?;
            let (display_name, email) = account
                .map(|u| (u.display_name, u.email))
                .unwrap_or_default();

            summaries.push(ThreadSummary {
                user_id: thread_user_id,
                display_name,
                email,
                last_message: last.content,
                last_sender: last.sender,
                last_message_at: last.created_at,
                unread_count,
            });
        }

        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(summaries)
    }

    /// Marks all pending user messages in a thread as read by the admin.
    #[instrument(skip(self))]
    pub async fn mark_thread_read(&self, thread_user_id: Uuid) -> Result<u64, ServiceError> {
        let result = chat_message::Entity::update_many()
            .set(chat_message::ActiveModel {
                read_by_admin: Set(true),
                ..Default::default()
            })
            .filter(chat_message::Column::UserId.eq(thread_user_id))
            .filter(chat_message::Column::Sender.eq(ChatSender::User))
            .filter(chat_message::Column::ReadByAdmin.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
