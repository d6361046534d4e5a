//! REST API for relay health and statistics
//!
//! Exposes `GET /health` and `GET /stats`. Responses use the `ApiResponse`
//! envelope.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::config::ApiConfig;
use crate::relay::{RelayStats, RelayStatsSnapshot};

// ============================================================================
// SHARED RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn get_stats_handler(stats: Arc<RelayStats>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&ApiResponse::<RelayStatsSnapshot> {
        success: true,
        data: Some(stats.snapshot()),
        error: None,
    }))
}

/// Creates a warp filter that provides access to the relay statistics.
pub fn with_stats(
    stats: Arc<RelayStats>,
) -> impl Filter<Extract = (Arc<RelayStats>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || stats.clone())
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Converts warp rejections into `ApiResponse` errors with matching status codes.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
        status,
    ))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

pub struct ApiServer {
    config: ApiConfig,
    stats: Arc<RelayStats>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, stats: Arc<RelayStats>) -> Self {
        Self { config, stats }
    }

    /// Binds to the configured host and port and serves until the process exits.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.config.host, self.config.port
        );

        let addr: std::net::SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(self.create_routes()).run(addr).await;

        Ok(())
    }

    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| {
                warp::reply::json(&ApiResponse::<String> {
                    success: true,
                    data: Some("Relay bridge is running".to_string()),
                    error: None,
                })
            });

        let stats = warp::path("stats")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_stats(self.stats.clone()))
            .and_then(get_stats_handler);

        health.or(stats).recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
