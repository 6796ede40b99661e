pub mod error;
pub mod health;
pub mod predict;
pub mod response;
pub mod v1;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::ServerConfig, ml::inference::ShortfallService};

/// Shared handler state; the service is immutable after startup
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ShortfallService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: ShortfallService) -> Self {
        Self {
            service: Arc::new(service),
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: AppState, cfg: &ServerConfig) -> Router {
    let health = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(state.clone());

    let mut router = Router::new()
        .nest("/api/v1", v1::router(state))
        .merge(health);

    if cfg.enable_cors {
        use tower_http::cors::Any;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(cfg.max_body_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}
