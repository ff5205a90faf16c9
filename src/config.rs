use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Base URL this API is reachable at, used when building absolute media links.
    pub public_base_url: String,
    pub uploads_dir: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));
        let uploads_dir = env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string());
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default();
        let checkout_success_url = env::var("CHECKOUT_SUCCESS_URL")
            .unwrap_or_else(|_| format!("{public_base_url}/checkout/success"));
        let checkout_cancel_url = env::var("CHECKOUT_CANCEL_URL")
            .unwrap_or_else(|_| format!("{public_base_url}/cart"));
        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            uploads_dir,
            stripe_secret_key,
            stripe_webhook_secret,
            checkout_success_url,
            checkout_cancel_url,
        })
    }
}
