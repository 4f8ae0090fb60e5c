//! Gatehouse authentication server.
//!
//! Wires the configuration, provider client, key cache, and session store
//! together and serves the `/auth` routes.

mod auth;
mod config;

use std::sync::Arc;
use std::time::Duration;

use gatehouse_identity::SessionStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{AppState, MemorySessionStore, spawn_cleanup_task};
use auth::{jwks::KeyCache, provider::ProviderClient};
use config::ServerConfig;

/// Timeout for calls to the identity provider.
const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // One HTTP client with an explicit timeout for all provider calls
    let http = reqwest::Client::builder()
        .timeout(PROVIDER_HTTP_TIMEOUT)
        .build()
        .expect("failed to build HTTP client");

    // Bind the provider client to its configuration up front; an
    // incomplete configuration is fatal here rather than on the first
    // login attempt.
    let jwks_url = config.provider.jwks_endpoint();
    let provider = match ProviderClient::new(config.provider, http.clone()) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(error = %e, "Identity provider configuration is incomplete");
            std::process::exit(1);
        }
    };
    tracing::info!(
        client_id = provider.config().client_id(),
        issuer = provider.config().issuer(),
        "Identity provider configured"
    );

    let keys = KeyCache::new(jwks_url, config.jwks.refresh_seconds, http);

    // In-memory session store with periodic expiry cleanup
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let _cleanup_handle = spawn_cleanup_task(
        Arc::clone(&sessions),
        config.session.cleanup_interval_seconds,
    );

    let state = Arc::new(AppState::new(
        provider,
        keys,
        sessions,
        config.session.clone(),
    ));

    let app = auth::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("Shutdown signal received");
}
