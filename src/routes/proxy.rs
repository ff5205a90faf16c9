use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    error::AppResult,
    routes::params::ProxyQuery,
    services::proxy_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", get(proxy_image))
        .route("/pdf", get(proxy_pdf))
}

const PROXY_CACHE_CONTROL: &str = "public, max-age=86400";

#[utoipa::path(
    get,
    path = "/api/proxy/image",
    params(
        ("url" = String, Query, description = "External URL to fetch"),
        ("thumbnail" = Option<bool>, Query, description = "Accepted but not used for resizing"),
    ),
    responses(
        (status = 200, description = "Fetched image bytes"),
        (status = 400, description = "Invalid URL"),
    ),
    tag = "Proxy"
)]
pub async fn proxy_image(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> AppResult<Response> {
    let payload =
        proxy_service::fetch_image(&state, &query.url, query.thumbnail.unwrap_or(false)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, payload.content_type),
            (header::CACHE_CONTROL, PROXY_CACHE_CONTROL.to_string()),
        ],
        payload.bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/proxy/pdf",
    params(("url" = String, Query, description = "External URL to fetch")),
    responses(
        (status = 200, description = "Fetched PDF bytes"),
        (status = 400, description = "Invalid URL"),
        (status = 502, description = "Upstream is not a PDF"),
    ),
    tag = "Proxy"
)]
pub async fn proxy_pdf(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> AppResult<Response> {
    let payload = proxy_service::fetch_pdf(&state, &query.url).await?;
    Ok((
        [
            (header::CONTENT_TYPE, payload.content_type),
            (header::CACHE_CONTROL, PROXY_CACHE_CONTROL.to_string()),
        ],
        payload.bytes,
    )
        .into_response())
}
