use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::dto::products::{CreateProductRequest, ProductList, UpdateProductRequest};
use crate::entity::order_items::{Column as OrderItemCol, Entity as OrderItems};
use crate::entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel};
use crate::entity::categories::Entity as Categories;
use crate::error::{AppError, AppResult};
use crate::media::resolver::{self, MediaSlots};
use crate::media::store::{self, AssetType, MediaSlot, StorageLocation, UploadedFile};
use crate::media::{image_data, proxy};
use crate::middleware::auth::AuthUser;
use crate::models::{MediaRef, Product};
use crate::response::{ApiResponse, Meta};
use crate::routes::params::{ProductQuery, ProductSortBy, SortOrder};
use crate::services::visibility;
use crate::state::AppState;
use crate::audit::log_audit;

pub async fn list_products(
    state: &AppState,
    viewer: Option<&AuthUser>,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(filter) =
        visibility::row_filter(viewer, Column::UserId, Column::IsPublic, Column::Hidden)
    {
        condition = condition.add(filter);
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: i32,
) -> AppResult<ApiResponse<Product>> {
    let product = find_visible(state, viewer, id).await?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
    file: Option<UploadedFile>,
) -> AppResult<ApiResponse<Product>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(state, category_id).await?;
    }

    let mut active = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock.unwrap_or(0).max(0)),
        has_physical_variant: Set(payload.has_physical_variant.unwrap_or(false)),
        physical_price: Set(payload.physical_price),
        image_file: Set(None),
        image_data: Set(None),
        pdf_file: Set(None),
        pdf_data: Set(None),
        storage_url: Set(payload.storage_url.filter(|s| !s.trim().is_empty())),
        category_id: Set(payload.category_id),
        user_id: Set(Some(user.user_id)),
        is_public: Set(Some(payload.is_public.unwrap_or(true))),
        hidden: Set(payload.hidden.unwrap_or(false)),
        created_at: NotSet,
        updated_at: NotSet,
    };

    if let Some(file) = file.as_ref() {
        let (asset, location) =
            parse_storage_choice(payload.storage_type.as_deref(), payload.storage_location.as_deref())?;
        store::save_upload(&state.config.uploads_dir, asset, location, file, &mut active).await?;
    }

    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateProductRequest,
    file: Option<UploadedFile>,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_visible(state, Some(user), id).await?;
    if !visibility::can_mutate(user, existing.user_id) {
        return Err(AppError::Forbidden);
    }

    if let Some(category_id) = payload.category_id {
        ensure_category_exists(state, category_id).await?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("Stock cannot be negative".into()));
        }
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(flag) = payload.has_physical_variant {
        active.has_physical_variant = Set(flag);
    }
    if let Some(physical_price) = payload.physical_price {
        active.physical_price = Set(Some(physical_price));
    }
    if let Some(url) = payload.storage_url {
        active.storage_url = Set(Some(url).filter(|s| !s.trim().is_empty()));
    }
    if let Some(is_public) = payload.is_public {
        active.is_public = Set(Some(is_public));
    }
    if let Some(hidden) = payload.hidden {
        active.hidden = Set(hidden);
    }

    if let Some(file) = file.as_ref() {
        let (asset, location) =
            parse_storage_choice(payload.storage_type.as_deref(), payload.storage_location.as_deref())?;
        store::save_upload(&state.config.uploads_dir, asset, location, file, &mut active).await?;
    }

    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_visible(state, Some(user), id).await?;
    if !visibility::can_mutate(user, existing.user_id) {
        return Err(AppError::Forbidden);
    }

    // Order history references the product by id; deleting would orphan it.
    // Callers are advised to zero the stock instead.
    let referenced = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if referenced > 0 {
        return Err(AppError::DeleteBlocked {
            kind: "PRODUCT_HAS_ORDERS",
            ids: vec![id],
        });
    }

    Products::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
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

/// Clear one media slot. Idempotent: clearing an already-null slot still
/// answers 200 with no further side effect.
pub async fn delete_storage_slot(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    slot_name: &str,
) -> AppResult<ApiResponse<Product>> {
    let slot = MediaSlot::parse(slot_name)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid storage type {slot_name}")))?;

    let existing = find_visible(state, Some(user), id).await?;
    if !visibility::can_mutate(user, existing.user_id) {
        return Err(AppError::Forbidden);
    }

    let mut active: ActiveModel = existing.clone().into();
    store::clear_slot(&state.config.uploads_dir, &existing, slot, &mut active).await;
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_storage_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id, "slot": slot_name })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Storage cleared",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Decoded binary ready to stream back.
pub struct MediaPayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Stream the image: the database slot decodes first, the file slot is the
/// fallback.
pub async fn serve_image(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: i32,
) -> AppResult<MediaPayload> {
    let product = find_visible(state, viewer, id).await?;

    if let Some(raw) = product.image_data.as_deref().filter(|s| !s.is_empty()) {
        let decoded = image_data::decode(raw)
            .ok_or_else(|| AppError::BadRequest("Stored image data is unreadable".into()))?;
        return Ok(MediaPayload {
            filename: format!("product_{id}{}", extension_for(&decoded.content_type)),
            content_type: decoded.content_type,
            bytes: decoded.bytes,
        });
    }

    if let Some(rel_path) = product.image_file.as_deref().filter(|s| !s.is_empty()) {
        let bytes = store::read_file_slot(&state.config.uploads_dir, rel_path).await?;
        let content_type = proxy::infer_image_mime_from_url(rel_path)
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = rel_path.rsplit('/').next().unwrap_or("image").to_string();
        return Ok(MediaPayload {
            content_type,
            bytes,
            filename,
        });
    }

    Err(AppError::NotFound)
}

pub async fn serve_pdf(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: i32,
) -> AppResult<MediaPayload> {
    use base64::Engine;
    let product = find_visible(state, viewer, id).await?;

    if let Some(raw) = product.pdf_data.as_deref().filter(|s| !s.is_empty()) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|_| AppError::BadRequest("Stored PDF data is unreadable".into()))?;
        return Ok(MediaPayload {
            content_type: "application/pdf".into(),
            bytes,
            filename: format!("product_{id}.pdf"),
        });
    }

    if let Some(rel_path) = product.pdf_file.as_deref().filter(|s| !s.is_empty()) {
        let bytes = store::read_file_slot(&state.config.uploads_dir, rel_path).await?;
        let filename = rel_path.rsplit('/').next().unwrap_or("document.pdf").to_string();
        return Ok(MediaPayload {
            content_type: "application/pdf".into(),
            bytes,
            filename,
        });
    }

    Err(AppError::NotFound)
}

async fn find_visible(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: i32,
) -> AppResult<ProductModel> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    // Filtered-out rows answer 404, indistinguishable from absent rows.
    if !visibility::can_view(viewer, product.user_id, product.is_public, product.hidden) {
        return Err(AppError::NotFound);
    }
    Ok(product)
}

async fn ensure_category_exists(state: &AppState, category_id: i32) -> AppResult<()> {
    let found = Categories::find_by_id(category_id).one(&state.orm).await?;
    if found.is_none() {
        return Err(AppError::BadRequest(format!(
            "Category {category_id} does not exist"
        )));
    }
    Ok(())
}

fn parse_storage_choice(
    storage_type: Option<&str>,
    storage_location: Option<&str>,
) -> AppResult<(AssetType, StorageLocation)> {
    let asset = storage_type
        .and_then(AssetType::parse)
        .ok_or_else(|| AppError::BadRequest("storage_type must be image or pdf".into()))?;
    let location = storage_location
        .and_then(StorageLocation::parse)
        .ok_or_else(|| {
            AppError::BadRequest("storage_location must be database or file".into())
        })?;
    Ok((asset, location))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/svg+xml" => ".svg",
        _ => ".jpg",
    }
}

pub fn product_from_entity(model: ProductModel) -> Product {
    let media = resolver::resolve(
        model.id,
        &MediaSlots {
            image_file: model.image_file.as_deref(),
            image_data: model.image_data.as_deref(),
            pdf_file: model.pdf_file.as_deref(),
            pdf_data: model.pdf_data.as_deref(),
            storage_url: model.storage_url.as_deref(),
        },
    )
    .map(|resolved| MediaRef {
        kind: resolved.kind.as_str().to_string(),
        source: resolved.source.as_str().to_string(),
        url: resolved.source.url().to_string(),
    });

    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        has_physical_variant: model.has_physical_variant,
        physical_price: model.physical_price,
        image_file: model.image_file,
        image_data: model.image_data,
        pdf_file: model.pdf_file,
        pdf_data: model.pdf_data,
        storage_url: model.storage_url,
        category_id: model.category_id,
        user_id: model.user_id,
        is_public: model.is_public,
        hidden: model.hidden,
        media,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
