/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": 200,
///   "message": "healthy",
///   "data": { "version": "0.1.0", "database": "connected" }
/// }
/// ```
///
/// A failing database check still answers 200 with `"degraded"`, so load
/// balancers keep routing while the pool recovers.

use crate::{app::AppState, response::ApiResponse};
use axum::extract::State;
use nexus_shared::db::pool::health_check as database_health;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let connected = match database_health(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            false
        }
    };

    ApiResponse::ok(
        if connected { "healthy" } else { "degraded" },
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
        },
    )
}
