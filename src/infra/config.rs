use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;
use url::Url;

use crate::domain::entities::entitlement::EntitlementPolicy;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    /// Lifetime of the session token handed out after registration completes.
    pub session_token_ttl: Duration,
    /// Origin of the web app, used to build checkout and portal return URLs.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub database_url: String,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy (Caddy, nginx).
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    /// The single premium price offered.
    pub stripe_price_id: String,
    pub trial_days: u32,
    /// Hours of premium access kept after a failed renewal. Unset means none.
    pub past_due_grace_hours: Option<i64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let session_token_ttl_secs: i64 = get_env_default("SESSION_TOKEN_TTL_SECS", 3_600);

        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 30);
        let database_url: String = get_env("DATABASE_URL");
        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let stripe_price_id: String = get_env("STRIPE_PRICE_ID");
        let trial_days: u32 = get_env_default("TRIAL_DAYS", 7);
        let past_due_grace_hours: Option<i64> = std::env::var("PAST_DUE_GRACE_HOURS")
            .ok()
            .and_then(|s| s.parse().ok());

        Self {
            jwt_secret,
            session_token_ttl: Duration::seconds(session_token_ttl_secs),
            app_origin,
            cors_origin,
            bind_addr,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            database_url,
            trust_proxy,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_price_id,
            trial_days,
            past_due_grace_hours,
        }
    }

    pub fn entitlement_policy(&self) -> EntitlementPolicy {
        match self.past_due_grace_hours {
            Some(hours) if hours > 0 => {
                EntitlementPolicy::with_grace(chrono::Duration::hours(hours))
            }
            _ => EntitlementPolicy::default(),
        }
    }
}
