use crate::{
    entities::product,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Catalog service. Reads are public; mutations are reserved for the back
/// office and validated before touching the database.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 4096))]
    pub description: String,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(length(max = 4))]
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub banner: bool,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 4096))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub category: Option<String>,
    #[validate(custom = "validate_price_opt")]
    pub price: Option<Decimal>,
    #[validate(length(max = 4))]
    pub image_urls: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub banner: Option<bool>,
    pub filters: Option<serde_json::Value>,
}

/// Catalog listing filters. All fields combine with AND.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub banner: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("price_not_positive"));
    }
    Ok(())
}

fn validate_price_opt(price: &Decimal) -> Result<(), ValidationError> {
    validate_price(price)
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            price: Set(input.price),
            image_urls: Set(serde_json::to_value(&input.image_urls)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            featured: Set(input.featured),
            banner: Set(input.banner),
            filters: Set(input.filters),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %created.id, "Created product");
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let existing = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(image_urls) = input.image_urls {
            active.image_urls = Set(serde_json::to_value(&image_urls)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?);
        }
        if let Some(featured) = input.featured {
            active.featured = Set(featured);
        }
        if let Some(banner) = input.banner {
            active.banner = Set(banner);
        }
        if let Some(filters) = input.filters {
            active.filters = Set(Some(filters));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Removes a product from the catalog. Order lines keep their captured
    /// title and price, so history is unaffected.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_product(product_id).await?;
        existing.delete(&*self.db).await?;

        info!(%product_id, "Deleted product");
        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;
        Ok(())
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductQuery,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut find = product::Entity::find();

        if let Some(category) = &query.category {
            find = find.filter(product::Column::Category.eq(category.clone()));
        }
        if let Some(featured) = query.featured {
            find = find.filter(product::Column::Featured.eq(featured));
        }
        if let Some(banner) = query.banner {
            find = find.filter(product::Column::Banner.eq(banner));
        }

        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let page = query.page.unwrap_or(1).max(1);

        let paginator = find
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;
        Ok((products, total))
    }
}
