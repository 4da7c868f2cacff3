//! Health check handler

use axum::{extract::State, Json};
use formtrap_core::constants::APP_VERSION;
use formtrap_core::TrapStats;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    engine: TrapStats,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: APP_VERSION,
        timestamp: state.trap.now().timestamp(),
        engine: state.trap.stats(),
    })
}
