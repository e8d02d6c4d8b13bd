//! wgforge server
//!
//! Serves `POST /api/generate-config`: fabricates a WireGuard-style config
//! for the requested country, publishes it and returns the download URL.

mod handlers;
mod messages;
mod settings;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wgforge_core::IpRangeTable;

use crate::handlers::{router, thread_rng_source, AppState};
use crate::settings::{Cli, Settings, StoreSettings};
use crate::storage::build_store;

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wgforge_server=debug,wgforge_core=info,tower_http=debug".into()),
        )
        .init();

    // Load settings
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    tracing::debug!("Settings: {:?}", settings);

    // Load range table once; read-only from here on
    let table = match &settings.ranges_file {
        Some(path) => IpRangeTable::from_file(path)
            .with_context(|| format!("loading range table {}", path.display()))?,
        None => IpRangeTable::builtin(),
    };
    tracing::info!("Serving countries: {}", table.country_names().join(", "));

    // Initialize storage
    let store = build_store(&settings.store)
        .await
        .context("initializing config store")?;

    let state = Arc::new(AppState {
        table,
        options: settings.generator_options(),
        store,
        locale: settings.locale,
        rng: thread_rng_source(),
    });

    // Build router; the local backend's files are served from this process
    let mut app = router(state);
    if let StoreSettings::Local(local) = &settings.store {
        app = app.nest_service("/configs", ServeDir::new(&local.directory));
    }

    // Start server
    let bind = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
