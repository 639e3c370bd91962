// src/routes/webhook.rs
use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use teloxide::types::Update;
use tracing::debug;

use crate::{
    error::AppError, message::event_from_update, services::analytics::AnalyticsData,
    state::SharedState,
};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Receive a Telegram update. The event is queued behind earlier ones for the
/// same chat, so the platform gets its 200 before a slow itinerary finishes.
pub async fn webhook_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, AppError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = headers.get(SECRET_HEADER).map(|v| v.as_bytes());
        if provided != Some(expected.as_bytes()) {
            return Err(AppError::Unauthorized);
        }
    }

    debug!(update_id = ?update.id, "update received");
    if let Some(event) = event_from_update(update) {
        state.queue.push(event);
    }
    Ok(StatusCode::OK)
}

pub async fn get_metrics_handler(State(state): State<SharedState>) -> Json<AnalyticsData> {
    Json(state.controller.analytics().snapshot().await)
}
