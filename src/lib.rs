//! Pet clinic analytics service.
//!
//! Two mechanisms sit behind the HTTP routes:
//! - a fan-out/fan-in aggregator ([`analytics`], [`worker`]) that analyzes
//!   every pet on a bounded worker pool and folds the results into one report
//! - a fixed-window per-caller rate limiter ([`rate_limit`], [`middleware`])
//!   guarding the owner search route

pub mod analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod repository;
pub mod state;
pub mod worker;

use axum::{Router, routing::get};
use std::sync::Arc;
use crate::handlers::{
    analytics_handler, find_owners_handler, health_handler, metrics_handler, pet_report_handler,
    pets_handler,
};
use crate::middleware::rate_limit_middleware;
use crate::state::AppState;

// Serve with `into_make_service_with_connect_info::<SocketAddr>()`, the
// limiter needs the peer address
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/analytics", get(analytics_handler))
        .route("/api/pets/{pet_id}/report", get(pet_report_handler))
        .route("/owners/find", get(find_owners_handler))
        .route("/pets", get(pets_handler))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit_middleware,
        ))
        .with_state(state)
}
