// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Read from a TOML file; every section and field is optional. Command-line
// flags and environment variables are layered on top by the server binary.
//
// ```toml
// [server]
// listen = "[::]:8070"
//
// [printer]
// transport = "net"
// host = "192.168.1.40:9100"
//
// [pipeline]
// queue_capacity = 10
// max_label_pixels = 16777216
// status_retention = 1000
// dry_run = false
// ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LabelwerkError, Result};
use crate::types::TransportKind;

/// Persistent application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub printer: PrinterConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

/// HTTP front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub listen: String,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "[::]:8070".into(),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Printer connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    pub transport: TransportKind,
    /// `host[:port]` of a networked printer.
    pub host: String,
    /// Serial device path, e.g. `/dev/ttyUSB0`.
    pub port: String,
    pub baud_rate: u32,
    /// Play a short tone sequence after connecting, as a liveness check.
    pub beep: bool,
    /// Upper bound on the payload of a single raster chunk.
    pub chunk_bytes: usize,
    pub connect_timeout_secs: u64,
    /// Pause between failed connection attempts.
    pub backoff_secs: u64,
    /// Consecutive connection failures tolerated before giving up.
    pub max_connect_failures: u32,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Network,
            host: String::new(),
            port: String::new(),
            baud_rate: 9600,
            beep: true,
            chunk_bytes: 4096,
            connect_timeout_secs: 10,
            backoff_secs: 5,
            max_connect_failures: 3,
        }
    }
}

impl PrinterConfig {
    /// The address for the configured transport: `host` for network printers,
    /// `port` for serial ones.
    pub fn address(&self) -> Result<&str> {
        let (field, value) = match self.transport {
            TransportKind::Network => ("host", self.host.as_str()),
            TransportKind::Serial => ("port", self.port.as_str()),
        };
        if value.trim().is_empty() {
            return Err(LabelwerkError::Config(format!(
                "printer.{field} must be set for transport '{}'",
                self.transport
            )));
        }
        Ok(value)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Job pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Jobs held before new submissions are shed.
    pub queue_capacity: usize,
    /// Largest label canvas, and largest source image, a job may ask for.
    pub max_label_pixels: u64,
    /// Finished jobs whose status stays queryable.
    pub status_retention: usize,
    /// Disable all printer I/O and simulate transmission time instead.
    pub dry_run: bool,
    /// Override for the simulated transmission time, in milliseconds.
    pub simulated_delay_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            max_label_pixels: PipelineConfig::DEFAULT_MAX_LABEL_PIXELS,
            status_retention: 1000,
            dry_run: false,
            simulated_delay_ms: None,
        }
    }
}

impl PipelineConfig {
    /// 4096 x 4096, a 64 MiB RGBA canvas.
    pub const DEFAULT_MAX_LABEL_PIXELS: u64 = 4096 * 4096;
}

/// Image database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("labelwerk.db"),
        }
    }
}

impl AppConfig {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::from_toml(&text)
            .map_err(|e| LabelwerkError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| LabelwerkError::Config(e.to_string()))?;
        if config.pipeline.queue_capacity == 0 {
            return Err(LabelwerkError::Config(
                "pipeline.queue_capacity must be at least 1".into(),
            ));
        }
        if config.pipeline.max_label_pixels == 0 {
            return Err(LabelwerkError::Config(
                "pipeline.max_label_pixels must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    /// Simulated transmission time used when `dry_run` is set.
    pub fn simulated_delay(&self) -> Duration {
        self.pipeline
            .simulated_delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.printer.transport.simulated_print_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config.server.listen, "[::]:8070");
        assert_eq!(config.pipeline.queue_capacity, 10);
        assert_eq!(config.printer.backoff(), Duration::from_secs(5));
        assert_eq!(config.printer.max_connect_failures, 3);
        assert!(config.printer.beep);
    }

    #[test]
    fn serial_section_is_parsed() {
        let config = AppConfig::from_toml(
            r#"
            [printer]
            transport = "serial"
            port = "/dev/ttyUSB0"
            baud_rate = 115200
            "#,
        )
        .expect("parse");
        assert_eq!(config.printer.transport, TransportKind::Serial);
        assert_eq!(config.printer.address().unwrap(), "/dev/ttyUSB0");
        assert_eq!(config.printer.baud_rate, 115200);
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let err = AppConfig::from_toml("[printer]\ntransport = \"usb\"\n").unwrap_err();
        assert!(matches!(err, LabelwerkError::Config(_)));
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        assert!(AppConfig::from_toml("[pipeline]\nqueue_capacity = 0\n").is_err());
    }

    #[test]
    fn pipeline_limits_default_and_parse() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.max_label_pixels, 4096 * 4096);
        assert_eq!(config.pipeline.status_retention, 1000);

        let config = AppConfig::from_toml(
            "[pipeline]\nmax_label_pixels = 1000000\nstatus_retention = 5\n",
        )
        .expect("parse");
        assert_eq!(config.pipeline.max_label_pixels, 1_000_000);
        assert_eq!(config.pipeline.status_retention, 5);
        assert!(AppConfig::from_toml("[pipeline]\nmax_label_pixels = 0\n").is_err());
    }

    #[test]
    fn missing_address_is_a_config_error() {
        let config = AppConfig::default();
        assert!(matches!(
            config.printer.address(),
            Err(LabelwerkError::Config(_))
        ));
    }

    #[test]
    fn simulated_delay_follows_transport_unless_overridden() {
        let mut config = AppConfig::default();
        config.printer.transport = TransportKind::Serial;
        assert_eq!(config.simulated_delay(), Duration::from_secs(12));
        config.pipeline.simulated_delay_ms = Some(20);
        assert_eq!(config.simulated_delay(), Duration::from_millis(20));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.storage.database, PathBuf::from("labelwerk.db"));
    }

    #[test]
    fn file_is_read_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("labelwerk.toml");
        std::fs::write(&path, "[pipeline]\ndry_run = true\n").expect("write");
        let config = AppConfig::load(&path).expect("load");
        assert!(config.pipeline.dry_run);
    }
}
