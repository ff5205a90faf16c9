use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    media::store::UploadedFile,
    middleware::auth::{AuthUser, OptionalAuthUser},
    models::Product,
    response::ApiResponse,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/", post(create_product))
        .route("/{id}", get(get_product))
        .route("/{id}", patch(update_product))
        .route("/{id}", delete(delete_product))
        .route("/{id}/storage/{slot}", delete(delete_storage_slot))
        .route("/{id}/img", get(serve_image))
        .route("/{id}/pdf", get(serve_pdf))
        .route("/{id}/download/image", get(download_image))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name/description"),
        ("category_id" = Option<i32>, Query, description = "Filter by category"),
    ),
    responses(
        (status = 200, description = "List visible products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, viewer.as_ref(), query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Absent or not visible"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, viewer.as_ref(), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content = CreateProductRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Validation failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    let (fields, file) = read_form(multipart).await?;
    let payload = build_create_request(&fields)?;
    let resp = product_service::create_product(&state, &user, payload, file).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    request_body(content = UpdateProductRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Partial update", body = ApiResponse<Product>),
        (status = 403, description = "Not owner or admin"),
        (status = 404, description = "Absent or not visible"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    let (fields, file) = read_form(multipart).await?;
    let payload = build_update_request(&fields)?;
    let resp = product_service::update_product(&state, &user, id, payload, file).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Blocked by order history (type PRODUCT_HAS_ORDERS)"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/storage/{slot}",
    params(
        ("id" = i32, Path, description = "Product ID"),
        ("slot" = String, Path, description = "image_file | image_data | pdf_file | pdf_data"),
    ),
    responses(
        (status = 200, description = "Slot cleared (idempotent)", body = ApiResponse<Product>),
        (status = 400, description = "Unknown slot"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_storage_slot(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, slot)): Path<(i32, String)>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::delete_storage_slot(&state, &user, id, &slot).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/img",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Image bytes from the DB slot or the file slot"),
        (status = 404, description = "No image stored"),
    ),
    tag = "Products"
)]
pub async fn serve_image(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let payload = product_service::serve_image(&state, viewer.as_ref(), id).await?;
    Ok(([(header::CONTENT_TYPE, payload.content_type)], payload.bytes).into_response())
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/pdf",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "PDF bytes from the DB slot or the file slot"),
        (status = 404, description = "No PDF stored"),
    ),
    tag = "Products"
)]
pub async fn serve_pdf(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let payload = product_service::serve_pdf(&state, viewer.as_ref(), id).await?;
    Ok(([(header::CONTENT_TYPE, payload.content_type)], payload.bytes).into_response())
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/download/image",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Image bytes as an attachment"),
        (status = 404, description = "No image stored"),
    ),
    tag = "Products"
)]
pub async fn download_image(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let payload = product_service::serve_image(&state, viewer.as_ref(), id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, payload.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", payload.filename),
            ),
        ],
        payload.bytes,
    )
        .into_response())
}

/// Drain the multipart form into text fields plus at most one file part
/// (field name `file`).
async fn read_form(
    mut multipart: Multipart,
) -> AppResult<(HashMap<String, String>, Option<UploadedFile>)> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
            if !bytes.is_empty() {
                file = Some(UploadedFile {
                    original_name,
                    content_type,
                    bytes,
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read field {name}: {e}")))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, file))
}

fn build_create_request(fields: &HashMap<String, String>) -> AppResult<CreateProductRequest> {
    let name = fields
        .get("name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("name is required".into()))?;
    let price = parse_decimal(fields, "price")?
        .ok_or_else(|| AppError::BadRequest("price is required".into()))?;

    Ok(CreateProductRequest {
        name,
        description: fields.get("description").cloned(),
        price,
        stock: parse_i32(fields, "stock")?,
        category_id: parse_i32(fields, "category_id")?,
        storage_type: fields.get("storage_type").cloned(),
        storage_location: fields.get("storage_location").cloned(),
        storage_url: fields.get("storage_url").cloned(),
        has_physical_variant: parse_bool(fields, "has_physical_variant")?,
        physical_price: parse_decimal(fields, "physical_price")?,
        is_public: parse_bool(fields, "is_public")?,
        hidden: parse_bool(fields, "hidden")?,
    })
}

fn build_update_request(fields: &HashMap<String, String>) -> AppResult<UpdateProductRequest> {
    Ok(UpdateProductRequest {
        name: fields.get("name").cloned(),
        description: fields.get("description").cloned(),
        price: parse_decimal(fields, "price")?,
        stock: parse_i32(fields, "stock")?,
        category_id: parse_i32(fields, "category_id")?,
        storage_type: fields.get("storage_type").cloned(),
        storage_location: fields.get("storage_location").cloned(),
        storage_url: fields.get("storage_url").cloned(),
        has_physical_variant: parse_bool(fields, "has_physical_variant")?,
        physical_price: parse_decimal(fields, "physical_price")?,
        is_public: parse_bool(fields, "is_public")?,
        hidden: parse_bool(fields, "hidden")?,
    })
}

fn parse_decimal(fields: &HashMap<String, String>, key: &str) -> AppResult<Option<Decimal>> {
    match fields.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<Decimal>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{key} must be a decimal number"))),
        None => Ok(None),
    }
}

fn parse_i32(fields: &HashMap<String, String>, key: &str) -> AppResult<Option<i32>> {
    match fields.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{key} must be an integer"))),
        None => Ok(None),
    }
}

fn parse_bool(fields: &HashMap<String, String>, key: &str) -> AppResult<Option<bool>> {
    match fields.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some("true") | Some("1") | Some("on") => Ok(Some(true)),
        Some("false") | Some("0") | Some("off") => Ok(Some(false)),
        Some(_) => Err(AppError::BadRequest(format!("{key} must be a boolean"))),
        None => Ok(None),
    }
}
