use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Category;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub is_public: Option<bool>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Some(None) cannot be expressed through JSON here; a parent is
    /// detached by sending parent_id: 0.
    pub parent_id: Option<i32>,
    pub is_public: Option<bool>,
    pub hidden: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

/// Node of the public navigation tree.
#[derive(Serialize, ToSchema)]
pub struct CategoryTreeNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryTreeNode>,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryTree {
    pub roots: Vec<CategoryTreeNode>,
}
