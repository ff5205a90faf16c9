use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;

use crate::audit::log_audit;
use crate::dto::categories::{
    CategoryList, CategoryTree, CategoryTreeNode, CreateCategoryRequest, UpdateCategoryRequest,
};
use crate::entity::categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel};
use crate::entity::products::{Column as ProductCol, Entity as Products};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::Category;
use crate::response::{ApiResponse, Meta};
use crate::services::visibility;
use crate::state::AppState;

pub async fn list_categories(
    state: &AppState,
    viewer: Option<&AuthUser>,
) -> AppResult<ApiResponse<CategoryList>> {
    let mut condition = Condition::all();
    if let Some(filter) =
        visibility::row_filter(viewer, Column::UserId, Column::IsPublic, Column::Hidden)
    {
        condition = condition.add(filter);
    }

    let items = Categories::find()
        .filter(condition)
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

/// Navigation tree. Stricter than the general rule: hidden rows stay out
/// even for admins, keeping the public tree clean. This divergence is
/// intentional.
pub async fn category_tree(
    state: &AppState,
    viewer: Option<&AuthUser>,
) -> AppResult<ApiResponse<CategoryTree>> {
    let mut condition = Condition::all().add(Column::Hidden.eq(false));
    if let Some(filter) =
        visibility::row_filter(viewer, Column::UserId, Column::IsPublic, Column::Hidden)
    {
        condition = condition.add(filter);
    }

    let rows = Categories::find()
        .filter(condition)
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Category tree",
        CategoryTree {
            roots: build_tree(rows),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_category(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: i32,
) -> AppResult<ApiResponse<Category>> {
    let category = find_visible(state, viewer, id).await?;
    Ok(ApiResponse::success(
        "Category",
        category_from_entity(category),
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Category name is required".into()));
    }
    if let Some(parent_id) = payload.parent_id {
        if Categories::find_by_id(parent_id).one(&state.orm).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "Parent category {parent_id} does not exist"
            )));
        }
    }

    let active = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        description: Set(payload.description),
        parent_id: Set(payload.parent_id),
        user_id: Set(Some(user.user_id)),
        is_public: Set(Some(payload.is_public.unwrap_or(true))),
        hidden: Set(payload.hidden.unwrap_or(false)),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let category = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let existing = find_visible(state, Some(user), id).await?;
    if !visibility::can_mutate(user, existing.user_id) {
        return Err(AppError::Forbidden);
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(parent_id) = payload.parent_id {
        // Sentinel 0 detaches the category from its parent.
        if parent_id == 0 {
            active.parent_id = Set(None);
        } else {
            ensure_acyclic(state, id, parent_id).await?;
            active.parent_id = Set(Some(parent_id));
        }
    }
    if let Some(is_public) = payload.is_public {
        active.is_public = Set(Some(is_public));
    }
    if let Some(hidden) = payload.hidden {
        active.hidden = Set(hidden);
    }
    active.updated_at = Set(Utc::now().into());

    let category = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_visible(state, Some(user), id).await?;
    if !visibility::can_mutate(user, existing.user_id) {
        return Err(AppError::Forbidden);
    }

    let children = Categories::find()
        .filter(Column::ParentId.eq(id))
        .all(&state.orm)
        .await?;
    if !children.is_empty() {
        return Err(AppError::DeleteBlocked {
            kind: "CATEGORY_HAS_CHILDREN",
            ids: children.iter().map(|c| c.id).collect(),
        });
    }

    let products = Products::find()
        .filter(ProductCol::CategoryId.eq(id))
        .all(&state.orm)
        .await?;
    if !products.is_empty() {
        return Err(AppError::DeleteBlocked {
            kind: "CATEGORY_HAS_PRODUCTS",
            ids: products.iter().map(|p| p.id).collect(),
        });
    }

    Categories::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Walk the ancestor chain from the proposed parent; accepting it must not
/// close a loop back to the category being updated.
async fn ensure_acyclic(state: &AppState, category_id: i32, new_parent_id: i32) -> AppResult<()> {
    if new_parent_id == category_id {
        return Err(AppError::BadRequest(
            "Category cannot be its own parent".into(),
        ));
    }

    let mut cursor = Some(new_parent_id);
    let mut seen = vec![category_id];
    while let Some(current) = cursor {
        if seen.contains(&current) {
            return Err(AppError::BadRequest(
                "Category parent chain would form a cycle".into(),
            ));
        }
        seen.push(current);
        let row = Categories::find_by_id(current).one(&state.orm).await?;
        cursor = match row {
            Some(row) => row.parent_id,
            None => {
                return Err(AppError::BadRequest(format!(
                    "Parent category {current} does not exist"
                )));
            }
        };
    }
    Ok(())
}

fn build_tree(rows: Vec<CategoryModel>) -> Vec<CategoryTreeNode> {
    let ids: std::collections::HashSet<i32> = rows.iter().map(|r| r.id).collect();
    let mut by_parent: HashMap<Option<i32>, Vec<CategoryModel>> = HashMap::new();
    for row in rows {
        // Rows whose parent was filtered out surface as roots.
        let key = row.parent_id.filter(|pid| ids.contains(pid));
        by_parent.entry(key).or_default().push(row);
    }
    attach_children(&mut by_parent, None)
}

fn attach_children(
    by_parent: &mut HashMap<Option<i32>, Vec<CategoryModel>>,
    parent: Option<i32>,
) -> Vec<CategoryTreeNode> {
    let rows = by_parent.remove(&parent).unwrap_or_default();
    rows.into_iter()
        .map(|row| {
            let id = row.id;
            CategoryTreeNode {
                category: category_from_entity(row),
                children: attach_children(by_parent, Some(id)),
            }
        })
        .collect()
}

async fn find_visible(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: i32,
) -> AppResult<CategoryModel> {
    let category = Categories::find_by_id(id).one(&state.orm).await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };
    if !visibility::can_view(viewer, category.user_id, category.is_public, category.hidden) {
        return Err(AppError::NotFound);
    }
    Ok(category)
}

pub fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
        parent_id: model.parent_id,
        user_id: model.user_id,
        is_public: model.is_public,
        hidden: model.hidden,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
