use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use petclinic_analytics::build_router;
use petclinic_analytics::clock::{Clock, SystemClock};
use petclinic_analytics::config::Args;
use petclinic_analytics::rate_limit::expiry_sweeper;
use petclinic_analytics::repository::{InMemoryOwnerRepository, OwnerRepository};
use petclinic_analytics::state::AppState;

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<()> {
    // parse cli arguments
    let args = Args::parse();
    init_logging(&args);

    let repository: Arc<dyn OwnerRepository> = Arc::new(InMemoryOwnerRepository::with_sample_data());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // creating shared state
    let state = Arc::new(AppState::new(
        repository,
        args.rate_limit_config(),
        args.analysis_workers,
        args.analysis_timeout(),
        Arc::clone(&clock),
    ));

    // spawn the background sweeper
    if let Some(every) = args.sweep_interval() {
        tokio::spawn(expiry_sweeper(Arc::clone(&state.rate_limiter), clock, every));
    }

    let app = build_router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let limits = state.rate_limiter.config();
    info!("Pet clinic analytics running on http://localhost:{}", args.port);
    info!(
        "Rate limit: {} requests per {} minute(s) on {} (enabled: {})",
        limits.max_requests, limits.window_size_minutes, limits.protected_route, limits.enabled
    );
    info!("Analysis pool: {} workers", args.analysis_workers);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // without a signal handler, run until killed
            tracing::warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    }
}
