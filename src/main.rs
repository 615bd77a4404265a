// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use loyalty_cards_api::{
    api::router,
    auth::{jwt::MIN_SECRET_KEY_LENGTH, TokenCodec},
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER, JWT_SECRET_ENV},
    revocation_sweeper::RevocationSweeper,
    state::AppState,
    storage::Database,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if config.jwt.secret_key.len() < MIN_SECRET_KEY_LENGTH {
        error!(
            variable = JWT_SECRET_ENV,
            min_bytes = MIN_SECRET_KEY_LENGTH,
            "Signing secret is too short"
        );
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database_path) {
        Ok(db) => db.with_timeout(config.database_timeout),
        Err(e) => {
            error!(path = %config.database_path.display(), error = %e, "Failed to open database");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %config.database_path.display(), "Database opened");

    let shutdown = CancellationToken::new();
    let state = AppState::new(db.clone(), TokenCodec::new(config.jwt.clone()))
        .with_shutdown(shutdown.clone());

    let sweeper = tokio::spawn(RevocationSweeper::new(db).run(shutdown.clone()));

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(host = %config.host, port = config.port, error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, "Loyalty cards API listening (docs at /docs)");

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stops the sweeper and anything still holding a request token
    shutdown.cancel();
    let _ = sweeper.await;

    match result {
        Ok(()) => {
            info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match LogFormat::from_env() {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "Failed to register SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C");
}
