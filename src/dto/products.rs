use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

/// Create payload, assembled from the multipart form fields.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
    /// image | pdf; required when a file is attached.
    pub storage_type: Option<String>,
    /// database | file; required when a file is attached.
    pub storage_location: Option<String>,
    pub storage_url: Option<String>,
    pub has_physical_variant: Option<bool>,
    #[schema(value_type = Option<f64>)]
    pub physical_price: Option<Decimal>,
    pub is_public: Option<bool>,
    pub hidden: Option<bool>,
}

/// PATCH payload: only supplied fields are changed.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
    pub storage_type: Option<String>,
    pub storage_location: Option<String>,
    pub storage_url: Option<String>,
    pub has_physical_variant: Option<bool>,
    #[schema(value_type = Option<f64>)]
    pub physical_price: Option<Decimal>,
    pub is_public: Option<bool>,
    pub hidden: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
