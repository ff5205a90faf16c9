use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub role: String,
}

/// Renderable media reference produced by the resolver for a product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaRef {
    /// "image" or "pdf".
    pub kind: String,
    /// "local_path", "api_endpoint" or "proxied_url".
    pub source: String,
    /// Where the client fetches the bytes from.
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock: i32,
    pub has_physical_variant: bool,
    #[schema(value_type = Option<f64>)]
    pub physical_price: Option<Decimal>,
    pub image_file: Option<String>,
    pub image_data: Option<String>,
    pub pdf_file: Option<String>,
    pub pdf_data: Option<String>,
    pub storage_url: Option<String>,
    pub category_id: Option<i32>,
    pub user_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub hidden: bool,
    /// Resolver output; None means "no content" placeholder.
    pub media: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub user_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i32,
    pub user_id: Uuid,
    pub status: String,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub variant_type: String,
}
