use crate::{
    adapters::http::app_state::AppState,
    application::ports::billing_provider::BillingProviderPort,
    infra::{
        config::AppConfig, postgres_persistence, rate_limit::RedisRateLimiter,
        stripe_billing_adapter::StripeBillingAdapter,
    },
    use_cases::{
        account::AccountRepo,
        entitlement::{EntitlementRepo, EntitlementUseCases},
        registration::RegistrationUseCases,
        webhook::{BillingEventRepo, WebhookUseCases},
    },
};
use secrecy::ExposeSecret;
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
        )
        .await?,
    );

    let billing: Arc<dyn BillingProviderPort> = Arc::new(StripeBillingAdapter::new(
        config.stripe_secret_key.expose_secret().to_string(),
        config.stripe_price_id.clone(),
    ));

    let entitlement_repo_arc = postgres_arc.clone() as Arc<dyn EntitlementRepo>;
    let account_repo_arc = postgres_arc.clone() as Arc<dyn AccountRepo>;
    let event_repo_arc = postgres_arc.clone() as Arc<dyn BillingEventRepo>;

    let entitlement_use_cases = Arc::new(EntitlementUseCases::new(
        entitlement_repo_arc,
        config.entitlement_policy(),
    ));

    let webhook_use_cases = WebhookUseCases::new(
        entitlement_use_cases.clone(),
        event_repo_arc,
        billing.clone(),
    );

    let registration_use_cases = RegistrationUseCases::new(
        account_repo_arc,
        entitlement_use_cases.clone(),
        billing,
        config.app_origin.clone(),
        config.trial_days,
    );

    tracing::info!(
        trial_days = config.trial_days,
        past_due_grace_hours = ?config.past_due_grace_hours,
        "Billing configured"
    );

    Ok(AppState {
        config: Arc::new(config),
        entitlement_use_cases,
        webhook_use_cases: Arc::new(webhook_use_cases),
        registration_use_cases: Arc::new(registration_use_cases),
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cvbuilder_billing=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
