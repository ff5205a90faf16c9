use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};

use crate::{
    dto::checkout::{CheckoutSessionResponse, CreateCheckoutSessionRequest, WebhookAck},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/create-checkout-session",
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Hosted checkout session URL", body = ApiResponse<CheckoutSessionResponse>),
        (status = 400, description = "Empty cart or invalid item"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCheckoutSessionRequest>,
) -> AppResult<Json<ApiResponse<CheckoutSessionResponse>>> {
    let resp = checkout_service::create_checkout_session(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/webhook",
    request_body(content = Vec<u8>, description = "Raw Stripe webhook payload"),
    responses(
        (status = 200, description = "Acknowledged; processing failures are reported in the body only", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Missing or invalid signature"),
    ),
    tag = "Checkout"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    // Raw bytes: signature verification is byte-exact and must see the
    // body before any JSON parsing touches it.
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());
    let resp = checkout_service::handle_webhook(&state, &body, signature).await?;
    Ok(Json(resp))
}
