//! Minimal Stripe REST client.
//!
//! The checkout flow needs exactly two calls: creating a hosted checkout
//! session and listing a session's line items after the webhook fires.
//! Requests are form-encoded per Stripe's API conventions, authenticated
//! with the secret key as the basic-auth username.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

const API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeClient<'a> {
    http: &'a reqwest::Client,
    secret_key: &'a str,
}

/// One line item for session creation.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    /// Unit price in minor currency units.
    pub unit_amount: i64,
    pub quantity: i64,
    /// digital | physical, carried in provider-side product metadata so the
    /// webhook can read it back.
    pub variant_type: String,
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub line_items: Vec<SessionLineItem>,
    /// Buyer id, encoded redundantly as both `client_reference_id` and
    /// `metadata[userId]`; the provider does not always populate both
    /// fields identically on the way back.
    pub buyer_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct LineItem {
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub amount_total: Option<i64>,
    pub price: Option<LinePrice>,
}

#[derive(Debug, Deserialize)]
pub struct LinePrice {
    pub unit_amount: Option<i64>,
    /// Present when the request expands `data.price.product`.
    pub product: Option<LineProduct>,
}

#[derive(Debug, Deserialize)]
pub struct LineProduct {
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl LineItem {
    /// Product name as the provider knows it: the expanded product's name,
    /// falling back to the line description.
    pub fn product_name(&self) -> Option<&str> {
        self.price
            .as_ref()
            .and_then(|p| p.product.as_ref())
            .and_then(|p| p.name.as_deref())
            .or(self.description.as_deref())
    }

    pub fn variant_type(&self) -> &str {
        self.price
            .as_ref()
            .and_then(|p| p.product.as_ref())
            .and_then(|p| p.metadata.get("variant_type"))
            .map(String::as_str)
            .unwrap_or("digital")
    }
}

impl<'a> StripeClient<'a> {
    pub fn new(http: &'a reqwest::Client, secret_key: &'a str) -> Self {
        Self { http, secret_key }
    }

    pub async fn create_checkout_session(
        &self,
        params: &CreateSessionParams,
    ) -> AppResult<CheckoutSession> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), params.success_url.clone()),
            ("cancel_url".into(), params.cancel_url.clone()),
            ("client_reference_id".into(), params.buyer_id.clone()),
            ("metadata[userId]".into(), params.buyer_id.clone()),
        ];
        for (i, item) in params.line_items.iter().enumerate() {
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                "usd".into(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][metadata][variant_type]"),
                item.variant_type.clone(),
            ));
        }

        let response = self
            .http
            .post(format!("{API_BASE}/checkout/sessions"))
            .basic_auth(self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("stripe request failed: {e}")))?;

        parse_stripe_response(response).await
    }

    pub async fn list_line_items(&self, session_id: &str) -> AppResult<Vec<LineItem>> {
        let response = self
            .http
            .get(format!("{API_BASE}/checkout/sessions/{session_id}/line_items"))
            .basic_auth(self.secret_key, None::<&str>)
            .query(&[("limit", "100"), ("expand[]", "data.price.product")])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("stripe request failed: {e}")))?;

        let list: LineItemList = parse_stripe_response(response).await?;
        Ok(list.data)
    }
}

async fn parse_stripe_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> AppResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stripe response read failed: {e}")))?;
    if !status.is_success() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "stripe returned {status}: {body}"
        )));
    }
    serde_json::from_str(&body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stripe response parse failed: {e}")))
}
