//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::auth::AppState;

/// Basic health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Detailed health response with component checks
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    /// Credential store
    pub database: ComponentHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// healthy or unhealthy
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Basic health check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Liveness check (is the process running)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness check (is the credential store reachable)
pub async fn readiness(State(state): State<Arc<AppState>>) -> Result<StatusCode, StatusCode> {
    state
        .settings
        .health_check()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(StatusCode::OK)
}

/// Detailed health check with all dependencies
pub async fn health_detailed(State(state): State<Arc<AppState>>) -> Json<DetailedHealthResponse> {
    let start = std::time::Instant::now();
    let db_check = state.settings.health_check().await;
    let db_latency = start.elapsed().as_millis() as u64;

    let db_status = match db_check {
        Ok(_) => ComponentHealth {
            status: "healthy".to_string(),
            latency_ms: Some(db_latency),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Credential store health check failed");
            ComponentHealth {
                status: "unhealthy".to_string(),
                latency_ms: None,
                error: Some("unreachable".to_string()),
            }
        }
    };

    let overall_status = if db_status.status == "healthy" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(DetailedHealthResponse {
        status: overall_status.to_string(),
        checks: HealthChecks {
            database: db_status,
        },
    })
}
