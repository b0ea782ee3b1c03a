use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mongodb::bson::doc;
use serde_json::json;

use crate::AppState;

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let scheduler_running = state.scheduler.is_running().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "scheduler_running": scheduler_running })),
    )
}

// GET /health/db
pub async fn health_db(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "mongo": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "mongo ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "mongo": "error", "error": e.to_string() })),
            )
        }
    }
}
