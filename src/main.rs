// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Listings API Server
//!
//! Signs users in through an OAuth2/OIDC provider and serves users and
//! listings from the search index.

use listings_backend::{config::Config, services::Cipher, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting listings API");

    // Refuse to start with a bad key rather than failing every request later
    let cipher = Cipher::from_base64_key(&config.encryption_key)
        .expect("ENCRYPTION_KEY must be url-safe base64 of 32 bytes");

    tracing::info!(
        index = %config.search_index_base(),
        provider = %config.provider.domain,
        mock_userinfo = config.provider.mock_userinfo,
        "Services configured"
    );

    let state = Arc::new(AppState::new(config.clone(), cipher));

    // Build router
    let app = listings_backend::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("listings_backend=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
