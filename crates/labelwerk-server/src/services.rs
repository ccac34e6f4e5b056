// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service wiring: open the image database, reach the printer, and start the
// pipeline. Call once at startup.

use std::sync::Arc;

use tracing::info;

use labelwerk_core::AppConfig;
use labelwerk_core::error::Result;
use labelwerk_print::{
    ConnectionManager, Device, ImageStore, Pipeline, SqliteImageStore, StatusBoard,
};

use crate::state::AppState;

/// Running backend: the router state plus the pipeline that feeds it.
pub struct Services {
    pub state: AppState,
    pub pipeline: Pipeline,
}

impl Services {
    /// Bring up every backend subsystem described by `config`.
    ///
    /// Printer connection failures past the retry budget are returned as
    /// fatal errors.
    pub async fn init(config: &AppConfig) -> Result<Self> {
        info!(path = %config.storage.database.display(), "initialising services");
        let store: Arc<dyn ImageStore> =
            Arc::new(SqliteImageStore::open(&config.storage.database)?);
        let device = connect_device(config).await?;
        Ok(Self::with_parts(config, store, device))
    }

    /// Assemble services from an already-open store and device.
    pub fn with_parts(config: &AppConfig, store: Arc<dyn ImageStore>, device: Device) -> Self {
        let status = Arc::new(StatusBoard::with_retention(
            config.pipeline.status_retention,
        ));
        let pipeline = Pipeline::start(
            &config.pipeline,
            store.clone(),
            status.clone(),
            device,
        );
        let state = AppState::new(
            pipeline.admission(),
            status,
            store,
            config.server.max_upload_bytes,
        );
        Self { state, pipeline }
    }
}

async fn connect_device(config: &AppConfig) -> Result<Device> {
    if config.pipeline.dry_run {
        let delay = config.simulated_delay();
        info!(delay_ms = delay.as_millis() as u64, "dry run, printer disabled");
        return Ok(Device::Simulated { delay });
    }

    let manager = ConnectionManager::from_config(&config.printer)?;
    let established = manager.establish().await?;
    info!(
        transport = %config.printer.transport,
        failures = established.failures,
        "printer ready"
    );
    Ok(Device::Printer(established.printer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelwerk_core::error::LabelwerkError;

    #[tokio::test]
    async fn dry_run_needs_no_printer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.pipeline.dry_run = true;
        config.storage.database = dir.path().join("labels.db");

        let Services { state, pipeline } = Services::init(&config).await.expect("init");
        assert!(config.storage.database.exists());
        drop(state);
        pipeline.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn missing_printer_address_fails_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.storage.database = dir.path().join("labels.db");

        let err = Services::init(&config).await.err().expect("no printer configured");
        assert!(matches!(err, LabelwerkError::Config(_)));
    }
}
