//! HTTP API.
//!
//! - `GET /api/health`: liveness probe
//! - `POST /api/fetch`: resolve `{ "url": ... }` to a direct video URL
//!
//! Anything else falls through to the static asset directory when one is
//! configured.

pub mod error;
pub mod handlers;
pub mod state;

use std::path::PathBuf;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::{ApiError, ApiResult};
pub use handlers::FetchResponse;
pub use state::AppState;

use crate::config::Config;

/// Transport settings for the router, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_body_bytes: usize,
    pub cors_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
}

impl From<&Config> for RouterOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            cors_origins: config.cors_origins.clone(),
            static_dir: config.resolved_static_dir(),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        let config = Config::default();
        Self {
            max_body_bytes: config.max_body_bytes,
            cors_origins: config.cors_origins,
            static_dir: None,
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState, options: &RouterOptions) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/fetch", post(handlers::fetch_video));

    let mut router = Router::new().nest("/api", api_routes);

    if let Some(dir) = &options.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(options.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&options.cors_origins))
        .with_state(state)
}

/// CORS policy: any origin for `*`, otherwise the listed origins only.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(600));

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(origins)
}
