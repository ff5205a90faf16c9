use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};

use crate::audit::log_audit;
use crate::dto::checkout::{
    CheckoutSessionResponse, CreateCheckoutSessionRequest, WebhookAck,
};
use crate::entity::order_items::ActiveModel as OrderItemActive;
use crate::entity::orders::ActiveModel as OrderActive;
use crate::entity::products::{Column as ProductCol, Entity as Products};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::{Order, OrderItem};
use crate::response::{ApiResponse, Meta};
use crate::services::order_service::{order_from_entity, order_item_from_entity};
use crate::services::visibility;
use crate::state::AppState;
use crate::stripe::client::{CreateSessionParams, LineItem, SessionLineItem, StripeClient};
use crate::stripe::webhook::{self, Event, SessionObject};

/// Build a hosted checkout session from the submitted cart. Prices come
/// from the product rows, never from the client.
pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCheckoutSessionRequest,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut line_items = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        let product = Products::find_by_id(item.product_id).one(&state.orm).await?;
        let product = match product {
            Some(p) => p,
            None => return Err(AppError::NotFound),
        };
        if !visibility::can_view(Some(user), product.user_id, product.is_public, product.hidden)
        {
            return Err(AppError::NotFound);
        }

        let variant = item.variant_type.as_deref().unwrap_or("digital");
        let unit_price = match variant {
            "digital" => product.price,
            "physical" => {
                if !product.has_physical_variant {
                    return Err(AppError::BadRequest(format!(
                        "Product {} has no physical variant",
                        product.id
                    )));
                }
                product.physical_price.unwrap_or(product.price)
            }
            other => {
                return Err(AppError::BadRequest(format!(
                    "Unknown variant type {other}"
                )));
            }
        };

        let unit_amount = (unit_price * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| AppError::BadRequest("Price out of range".into()))?;

        line_items.push(SessionLineItem {
            name: product.name,
            unit_amount,
            quantity: item.quantity,
            variant_type: variant.to_string(),
        });
    }

    let client = StripeClient::new(&state.http, &state.config.stripe_secret_key);
    let session = client
        .create_checkout_session(&CreateSessionParams {
            line_items,
            buyer_id: user.user_id.to_string(),
            success_url: state.config.checkout_success_url.clone(),
            cancel_url: state.config.checkout_cancel_url.clone(),
        })
        .await?;

    let url = session
        .url
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("checkout session has no URL")))?;

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            session_id: session.id,
            url,
        },
        Some(Meta::empty()),
    ))
}

/// Webhook entry point. Signature failures reject with 400 before any
/// processing; failures after verification still acknowledge with 200 so
/// the provider stops retrying, reporting the error in the body only.
pub async fn handle_webhook(
    state: &AppState,
    body: &[u8],
    signature_header: Option<&str>,
) -> AppResult<ApiResponse<WebhookAck>> {
    let header = signature_header
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".into()))?;
    if !webhook::verify_signature(body, header, &state.config.stripe_webhook_secret) {
        return Err(AppError::BadRequest("Invalid webhook signature".into()));
    }

    let event: Event = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Unreadable webhook payload: {e}")))?;

    if event.kind != "checkout.session.completed" {
        return Ok(ApiResponse::success(
            "Ignored",
            WebhookAck { received: true },
            None,
        ));
    }

    let session = event.data.object;
    let client = StripeClient::new(&state.http, &state.config.stripe_secret_key);
    let line_items = match client.list_line_items(&session.id).await {
        Ok(items) => items,
        Err(err) => {
            tracing::error!(session = %session.id, error = %err, "line item fetch failed");
            return Ok(ApiResponse::failure(format!(
                "Order creation failed: {err}"
            )));
        }
    };

    match materialize_order(state, &session, &line_items).await {
        Ok((order, _items)) => {
            tracing::info!(order_id = order.id, session = %session.id, "order created");
            Ok(ApiResponse::success(
                "Order created",
                WebhookAck { received: true },
                None,
            ))
        }
        Err(err) => {
            tracing::error!(session = %session.id, error = %err, "order creation failed");
            Ok(ApiResponse::failure(format!("Order creation failed: {err}")))
        }
    }
}

/// Create the order, its items and the stock decrements in one
/// transaction. Duplicate deliveries of the same session are not detected
/// and create duplicate orders.
pub async fn materialize_order(
    state: &AppState,
    session: &SessionObject,
    line_items: &[LineItem],
) -> AppResult<(Order, Vec<OrderItem>)> {
    let buyer_id = session
        .buyer_id()
        .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::BadRequest("Session carries no usable buyer id".into()))?;

    // The provider total is authoritative; the client-submitted cart total
    // is never trusted.
    let total = Decimal::new(session.amount_total.unwrap_or(0), 2);

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: NotSet,
        user_id: Set(buyer_id),
        status: Set("pending".into()),
        total: Set(total),
        stripe_session_id: Set(Some(session.id.clone())),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::new();
    for line in line_items {
        let Some(name) = line.product_name() else {
            tracing::warn!(session = %session.id, "line item without product name, skipped");
            continue;
        };
        // Lookup by name relies on name uniqueness; first match wins.
        let product = Products::find()
            .filter(ProductCol::Name.eq(name))
            .one(&txn)
            .await?;
        let Some(product) = product else {
            tracing::warn!(session = %session.id, product = %name, "no product matches line item, skipped");
            continue;
        };

        let quantity = line.quantity.unwrap_or(1).max(1) as i32;
        let unit_minor = line
            .price
            .as_ref()
            .and_then(|p| p.unit_amount)
            .or_else(|| line.amount_total.map(|t| t / i64::from(quantity.max(1))))
            .unwrap_or(0);
        let variant_type = line.variant_type().to_string();

        let item = OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(quantity),
            price: Set(Decimal::new(unit_minor, 2)),
            variant_type: Set(variant_type.clone()),
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));

        if variant_type == "physical" {
            // Floored per-request; concurrent purchases of the last unit
            // are not serialized against each other.
            Products::update_many()
                .col_expr(
                    ProductCol::Stock,
                    Expr::cust_with_values("GREATEST(stock - ?, 0)", [quantity]),
                )
                .filter(ProductCol::Id.eq(product.id))
                .exec(&txn)
                .await?;
        }
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(buyer_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "session_id": session.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok((order_from_entity(order), items))
}
