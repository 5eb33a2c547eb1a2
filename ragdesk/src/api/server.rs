//! API server for ragdesk

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Settings;
use crate::pipeline::AnswerPipeline;

use super::middleware::{rate_limit, RateLimiter};
use super::routes::{ask, health_check, query, AppState};

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

impl From<&Settings> for ApiServerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            cors_origins: settings.cors_origins.clone(),
            rate_limit_requests: settings.rate_limit_requests,
            rate_limit_window: settings.rate_limit_window,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    pipeline: Arc<AnswerPipeline>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, pipeline: Arc<AnswerPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Build the router with rate limiting and CORS applied
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            pipeline: Arc::clone(&self.pipeline),
        });
        let limiter = Arc::new(RateLimiter::new(
            self.config.rate_limit_requests,
            self.config.rate_limit_window,
        ));

        Router::new()
            .route("/query", post(query))
            .route("/ask", post(ask))
            .route("/health", get(health_check))
            .with_state(app_state)
            .layer(from_fn_with_state(limiter, rate_limit))
            .layer(cors_layer(&self.config.cors_origins))
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
