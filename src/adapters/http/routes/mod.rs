pub mod health;
pub mod stripe;
pub mod subscription;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/stripe", stripe::router())
        .merge(subscription::router())
        .merge(health::router())
}
