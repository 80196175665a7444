//! API routes

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use casemail_common::config::ApiConfig;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::{auth_middleware, AppState};
use crate::handlers::{email_settings, health, send};
use crate::openapi::create_openapi_routes;

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let state = Arc::new(state);

    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/detailed", get(health::health_detailed))
        .with_state(state.clone());

    // Email settings and relay routes with authentication
    let api = Router::new()
        .route("/email-settings", post(email_settings::save_email_settings))
        .route(
            "/email-settings/:user_id",
            get(email_settings::get_email_settings),
        )
        .route("/send-email", post(send::send_email))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    let mut router = Router::new()
        .nest("/health", health_routes)
        .nest("/api", api);

    // OpenAPI documentation routes
    if config.enable_docs {
        router = router.merge(create_openapi_routes());
    }

    router
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins; `*` allows any, none allows only same-origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-api-key"),
        ]);

    if origins.iter().any(|origin| origin == "*") {
        info!("CORS configured to allow any origin");
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return layer;
    }

    info!("CORS configured with allowed origins: {}", origins.join(","));
    layer.allow_origin(AllowOrigin::list(allowed))
}
