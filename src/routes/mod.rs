use axum::{Router, routing::post};

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod checkout;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod proxy;

// Build the API router without binding state; it is provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
        .nest("/auth", auth::router())
        .nest("/proxy", proxy::router())
        .route(
            "/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/webhook", post(checkout::webhook))
}
