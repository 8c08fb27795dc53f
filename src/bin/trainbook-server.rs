// ABOUTME: Trainbook HTTP server binary
// ABOUTME: Loads configuration, initializes logging and the database, then serves the REST API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! # Trainbook Server Binary
//!
//! Starts the template/session capture API on a single HTTP port.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use trainbook_server::{
    config::environment::ServerConfig, database::Database, logging, resources::ServerResources,
    routes::build_router,
};

#[derive(Parser)]
#[command(name = "trainbook-server")]
#[command(about = "Trainbook - coaching templates, session capture, records and goals")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL (e.g. `sqlite:./data/trainbook.db` or `sqlite::memory:`)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }

    logging::init(&config)?;
    info!("Starting Trainbook Server");
    info!("{}", config.summary());

    let database = Database::new(&config.database.url).await?;
    info!("Database initialized");

    let bind_addr = format!("{}:{}", config.host, config.http_port);
    let resources = Arc::new(ServerResources::new(database, Arc::new(config)));
    let app = build_router(resources);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("HTTP server listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {e}");
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received");
}
