// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked-Roles demo server
//!
//! Hosts the Discord linked roles verification flow and lets linked users'
//! role connection values be updated over HTTP.

use linked_roles::{config::Config, AppState, LinkedRolesClient};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting linked roles server");

    let client = LinkedRolesClient::new(config.client.clone())?;
    client.start().await?;

    let mut updates = client.subscribe_updates();
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            tracing::debug!(
                user_id = %update.user_id,
                before = ?update.before.as_ref().map(|c| c.metadata()),
                after = ?update.after.metadata(),
                "Role connection changed"
            );
        }
    });

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), client));

    // Build router
    let app = linked_roles::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.client.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linked_roles=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
