//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

pub use routes::create_router;

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers::{AccountDirectory, MoneyMovement};
use crate::store::Store;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState<S> {
    pub directory: AccountDirectory<S>,
    pub money: MoneyMovement<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        let money = MoneyMovement::new(store);
        Self {
            directory: money.directory().clone(),
            money,
        }
    }
}

/// Knobs for [`build_router`] that come from configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub debug_routes: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl RouterOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debug_routes: !config.is_production(),
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            debug_routes: true,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Build the application router
pub fn build_router<S: Store>(state: AppState<S>, options: &RouterOptions) -> Router {
    // Axum layers run in reverse order: trace -> cors -> logging -> handler
    let api_router = create_router::<S>(options.debug_routes).layer(
        axum::middleware::from_fn(middleware::logging_middleware),
    );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .layer(cors_layer(&options.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(middleware::CORRELATION_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(middleware::CORRELATION_ID_HEADER)])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
