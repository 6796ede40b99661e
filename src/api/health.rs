use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    uptime_secs: i64,
    checks: HealthChecks,
}

/// Individual health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    model: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(detail: String) -> Self {
        Self {
            status: "healthy".to_string(),
            detail: Some(detail),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            detail: None,
            error: Some(error),
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model_health = check_model(&state);
    let all_healthy = model_health.is_healthy();

    let now = chrono::Utc::now();
    let response = HealthResponse {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: now,
        uptime_secs: (now - state.started_at).num_seconds(),
        checks: HealthChecks {
            model: model_health,
        },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

/// The loaded model must accept exactly the schema's features
fn check_model(state: &AppState) -> ComponentHealth {
    let schema_len = state.service.schema().len();
    let input_dim = state.service.input_dim();

    if input_dim == schema_len {
        ComponentHealth::healthy(format!(
            "{} ({} features)",
            state.service.metadata().model_id,
            input_dim
        ))
    } else {
        ComponentHealth::unhealthy(format!(
            "model expects {} features, schema has {}",
            input_dim, schema_len
        ))
    }
}

/// GET /health/ready - Readiness probe for Kubernetes
///
/// The artifact is loaded before the listener binds, so a running server is
/// ready unless the model check fails.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if check_model(&state).is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe for Kubernetes
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
