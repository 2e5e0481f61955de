//! Storefront API library
//!
//! User accounts, product catalog, categories, a per-user cart and transactional checkout
//! served over HTTP with axum and persisted through SeaORM.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod telemetry;
pub mod uploads;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Extension, Router};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
};
use tracing::{info, warn};

use crate::auth::{AuthConfig, AuthService};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::handlers::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

impl AppState {
    /// Wires every service around a shared connection pool.
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let db = Arc::new(db);
        let config = Arc::new(config);
        let auth = Arc::new(AuthService::new(AuthConfig::from(config.as_ref())));
        let services = AppServices::new(db.clone(), auth.clone(), config.clone());

        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// Resource routers mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/user", handlers::commerce::users_routes())
        .nest("/products", handlers::commerce::products_routes())
        .nest("/categories", handlers::commerce::categories_routes())
        .nest("/cart", handlers::commerce::carts_routes())
        .nest("/order", handlers::commerce::orders_routes())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if config.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        warn!("No CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    }
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("Route not found".to_string())
}

/// Builds the complete application router with all middleware applied.
pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .nest("/api", api_routes())
        .nest("/health", health::health_routes())
        .nest_service(uploads::UPLOADS_ROUTE, ServeDir::new(&config.upload_dir))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(cors_layer(&config))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(telemetry::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(Extension(state.auth.clone()))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
