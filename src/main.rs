// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rep-Tracker API Server
//!
//! Serves per-user push/pull counters behind Google Sign-In sessions and
//! persists them to a JSON snapshot file.

use anyhow::Context;
use rep_tracker::{
    config::Config, db::CounterStore, services::GoogleIdTokenVerifier, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Rep-Tracker API");

    let store = CounterStore::open(config.data_file.clone(), config.dedup_window)
        .await
        .with_context(|| format!("Failed to open counter store {}", config.data_file.display()))?;
    tracing::info!(
        path = %store.path().display(),
        users = store.user_count().await,
        "Counter store loaded"
    );

    let identity_verifier = Arc::new(
        GoogleIdTokenVerifier::new(&config).context("Failed to initialize identity verifier")?,
    );

    let state = Arc::new(AppState::new(config.clone(), store, identity_verifier));
    spawn_purge_task(state.clone());

    let app = rep_tracker::routes::create_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutting down, flushing counter store");
    state.store.flush().await?;
    Ok(())
}

/// Periodically drop expired sessions and idle rate-limit entries.
fn spawn_purge_task(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let sessions = state.sessions.purge_expired();
            let clients = state.rate_limiter.purge_stale();
            if sessions > 0 || clients > 0 {
                tracing::debug!(sessions, clients, "Purged expired entries");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rep_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
