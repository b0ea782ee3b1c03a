use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

// GET /scheduler
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let running = state.scheduler.is_running().await;
    (StatusCode::OK, Json(json!({ "running": running })))
}

// POST /scheduler/start
pub async fn post_start(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.scheduler.start().await;
    (
        StatusCode::OK,
        Json(json!({ "running": true, "changed": changed })),
    )
}

// POST /scheduler/stop
pub async fn post_stop(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.scheduler.stop().await;
    (
        StatusCode::OK,
        Json(json!({ "running": false, "changed": changed })),
    )
}
