// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelwerk: HTTP print server for label printers.
//
// Entry point. Initialises logging, loads configuration, connects to the
// printer, starts the pipeline, and serves HTTP until interrupted.

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use labelwerk_core::AppConfig;
use labelwerk_core::error::Result;
use labelwerk_server::cli::Cli;
use labelwerk_server::{Services, app};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "labelwerk stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(&cli.config)?;
    cli.apply(&mut config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Labelwerk starting");

    let Services { state, pipeline } = Services::init(&config).await?;

    let listener = TcpListener::bind(&config.server.listen).await?;
    info!(addr = %config.server.listen, "listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("draining print queue");
    pipeline.shutdown().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
