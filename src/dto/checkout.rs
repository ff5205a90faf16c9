use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One cart row submitted for checkout. Prices are re-read server-side;
/// the client only names the product, the quantity and the variant.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: i32,
    pub quantity: i64,
    /// digital | physical; defaults to digital.
    pub variant_type: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCheckoutSessionRequest {
    pub items: Vec<CheckoutItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    /// Hosted checkout URL for the client-side redirect.
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}
