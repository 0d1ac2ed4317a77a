use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::Utc;

use crate::{
    adapters::http::{app_state::AppState, extractors::AuthUser},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/subscription", get(get_subscription))
}

/// GET /api/subscription
///
/// Evaluated on every call so trial and period expiry take effect without
/// any event arriving.
async fn get_subscription(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let view = app_state
        .entitlement_use_cases
        .view(user.user_id, Utc::now())
        .await?;
    Ok(Json(view))
}
