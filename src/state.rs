use crate::config::AppConfig;
use crate::db::{DbPool, OrmConn};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    /// Shared outbound client for the URL proxy and the Stripe API.
    pub http: reqwest::Client,
    pub config: AppConfig,
}
