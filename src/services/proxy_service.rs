//! Server-side fetch of external media URLs.
//!
//! Browsers refuse many third-party storage URLs outright (CORS, mixed
//! content), so the client asks this service to fetch on its behalf. URL
//! normalization and classification are pure (`media::proxy`); this module
//! owns the network half.

use axum::http::StatusCode;
use bytes::Bytes;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::media::proxy::{self, PreparedUrl, Provider};
use crate::state::AppState;

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const PDF_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ProxyPayload {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Fetch an external image. The `thumbnail` flag is accepted for API
/// compatibility; no resizing happens, thumbnail requests fetch the same
/// full payload.
pub async fn fetch_image(
    state: &AppState,
    raw_url: &str,
    _thumbnail: bool,
) -> AppResult<ProxyPayload> {
    reqwest::Url::parse(raw_url)
        .map_err(|_| AppError::BadRequest("Invalid URL".into()))?;

    // Short links carry no photo id; resolve redirects first, then re-apply
    // the extraction on whatever they land on.
    let effective = if proxy::is_google_short_link(raw_url) {
        resolve_short_link(state, raw_url).await
    } else {
        raw_url.to_string()
    };

    let prepared = proxy::prepare_url(&effective);
    let response = send_image_request(state, &prepared).await?;

    let response = if response.status() == reqwest::StatusCode::BAD_REQUEST
        && prepared.provider == Provider::GoogleUserContent
        && prepared.url.contains("=w1200")
    {
        // Some googleusercontent assets reject the width parameter; the
        // original-size form usually goes through.
        let retry = PreparedUrl {
            url: prepared.url.replace("=w1200", "=s0"),
            provider: prepared.provider,
        };
        send_image_request(state, &retry).await?
    } else {
        response
    };

    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let final_url = response.url().to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("Failed to read upstream body: {e}"),
        })?;

    let content_type = if proxy::is_heic(&bytes) {
        // Relabel only; the payload is untouched.
        "image/jpeg".to_string()
    } else {
        header_type
            .filter(|ct| proxy::looks_like_image(ct))
            .or_else(|| proxy::infer_image_mime_from_url(&final_url).map(str::to_string))
            .unwrap_or_else(|| "image/jpeg".to_string())
    };

    Ok(ProxyPayload {
        bytes,
        content_type,
    })
}

/// Fetch an external PDF: same CORS bypass, fixed timeout, and a
/// content-type gate instead of image sniffing.
pub async fn fetch_pdf(state: &AppState, raw_url: &str) -> AppResult<ProxyPayload> {
    reqwest::Url::parse(raw_url)
        .map_err(|_| AppError::BadRequest("Invalid URL".into()))?;

    let response = state
        .http
        .get(raw_url)
        .timeout(PDF_FETCH_TIMEOUT)
        .header(reqwest::header::USER_AGENT, BROWSER_UA)
        .send()
        .await
        .map_err(|e| AppError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("Fetch failed: {e}"),
        })?;

    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !content_type.contains("pdf") && !content_type.contains("application/octet-stream") {
        return Err(AppError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            detail: format!("Upstream is not a PDF: {content_type}"),
        });
    }

    let bytes = response.bytes().await.map_err(|e| AppError::Upstream {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: format!("Failed to read upstream body: {e}"),
    })?;

    Ok(ProxyPayload {
        bytes,
        content_type: "application/pdf".into(),
    })
}

async fn send_image_request(
    state: &AppState,
    prepared: &PreparedUrl,
) -> AppResult<reqwest::Response> {
    let mut request = state
        .http
        .get(&prepared.url)
        .header(reqwest::header::USER_AGENT, BROWSER_UA)
        .header(reqwest::header::ACCEPT, "image/*");

    match prepared.provider {
        Provider::GooglePhotos | Provider::GoogleUserContent => {
            request = request.header(reqwest::header::REFERER, "https://photos.google.com/");
        }
        Provider::Supabase => {
            request = request.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }
        _ => {}
    }

    request.send().await.map_err(|e| AppError::Upstream {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: format!("Fetch failed: {e}"),
    })
}

/// Follow a short link's redirects with a HEAD request; on any failure the
/// original URL is used as-is.
async fn resolve_short_link(state: &AppState, url: &str) -> String {
    match state
        .http
        .head(url)
        .header(reqwest::header::USER_AGENT, BROWSER_UA)
        .send()
        .await
    {
        Ok(response) => response.url().to_string(),
        Err(err) => {
            tracing::warn!(url, error = %err, "short link resolution failed");
            url.to_string()
        }
    }
}

async fn upstream_error(response: reqwest::Response) -> AppError {
    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let detail = response.text().await.unwrap_or_default();
    let detail: String = detail.chars().take(512).collect();
    AppError::Upstream { status, detail }
}
