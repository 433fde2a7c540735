// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aitk_marketplace::{
    api::router,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::{ConnectionSupervisor, StoreHandle},
};

const ENDPOINTS: &[&str] = &[
    "GET  /api/health",
    "GET  /api/services",
    "POST /api/auth/connect",
    "GET  /api/balance/{walletAddress}",
    "POST /api/transactions/create",
    "POST /api/transactions/confirm",
    "GET  /api/transactions/{walletAddress}",
];

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing(LogFormat::from_env());
    let config = AppConfig::from_env();

    let store = StoreHandle::with_seed(&config.database_path, config.services_seed_path.clone());
    if let Err(e) = store.connect() {
        error!(
            path = %config.database_path.display(),
            error = %e,
            "Database connection failed, retrying in background"
        );
    }

    let shutdown = CancellationToken::new();
    let supervisor = tokio::spawn(ConnectionSupervisor::new(store.clone()).run(shutdown.clone()));

    let state = AppState::new(store, config.chain.clone());
    let app = router(state, &config.frontend_origins).map_err(|e| {
        error!(error = %e, "Invalid FRONTEND_URL origin");
        e
    })?;

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(%addr, error = %e, "Failed to bind");
        e
    })?;

    info!(%addr, network = %config.chain.network, "AITK Marketplace Backend listening (docs at /docs)");
    for endpoint in ENDPOINTS {
        info!("  {endpoint}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    let _ = supervisor.await;
    info!("Server stopped");
    Ok(())
}
