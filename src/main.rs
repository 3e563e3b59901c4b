// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use itsm_rust_server::{
    api::router,
    auth::{AuthState, KeySetProvider, TokenValidator},
    config::{ConfigError, LogFormat, ServerConfig, TrustConfig, DEFAULT_LOG_FILTER},
    directory::CredentialExchanger,
    state::AppState,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let server = match ServerConfig::from_env() {
        Ok(server) => server,
        Err(e) => {
            init_tracing(LogFormat::default());
            error!(error = %e, "Invalid server configuration");
            std::process::exit(1);
        }
    };
    init_tracing(server.log_format);

    if let Err(e) = run(server).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(server: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let trust = Arc::new(TrustConfig::from_env()?);
    info!(
        tenant_id = %trust.tenant_id(),
        client_id = %trust.client_id(),
        redirect_uri = %trust.redirect_uri(),
        "Identity provider configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(itsm_rust_server::auth::jwks::JWKS_FETCH_TIMEOUT)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

    let keys = KeySetProvider::fetch(trust.jwks_url(), http)
        .await
        .map_err(ConfigError::from)?
        .with_refresh_interval(trust.jwks_refresh_interval());
    let keys = Arc::new(keys);

    let shutdown = CancellationToken::new();
    let refresh_task = keys.spawn_refresh(shutdown.clone());

    let validator = Arc::new(TokenValidator::new(keys, trust.clone()));
    let exchanger = Arc::new(CredentialExchanger::new(trust)?);
    let app = router(AppState::new(AuthState::new(validator), exchanger));

    let addr: SocketAddr = server.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "ITSM admin API listening (docs at /docs)");

    let signal_token = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    })
    .await?;

    shutdown.cancel();
    refresh_task.await?;
    info!("Server stopped");
    Ok(())
}
