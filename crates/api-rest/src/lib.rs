//! # API REST
//!
//! REST API for composing GP update-record messages.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns: the JSON error envelope, body-size and timeout limits, request
//!   tracing, correlation ids and idempotent replay
//!
//! Composition itself lives in `gpupdate-core`.

#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod idempotency;
pub mod relay;

pub use config::ServerConfig;
pub use error::ApiError;
pub use handlers::{ApiDoc, AppState};
pub use relay::{LoggingRelay, MessageRelay};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the application router.
///
/// The body-size cap and request timeout come from `config`; the listen address is the
/// caller's concern.
pub fn router(mut state: AppState, config: &ServerConfig) -> Router {
    state.body_limit = config.max_body_bytes();

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            handlers::UPDATE_RECORD_PATH,
            post(handlers::submit_update_record),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout()))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
