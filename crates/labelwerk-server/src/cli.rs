// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line flags. Anything set here overrides the config file.

use std::path::PathBuf;

use clap::Parser;

use labelwerk_core::AppConfig;
use labelwerk_core::error::Result;
use labelwerk_core::types::TransportKind;

#[derive(Debug, Parser)]
#[command(name = "labelwerk", version, about = "HTTP print server for label printers")]
pub struct Cli {
    /// TOML config file; missing means defaults.
    #[arg(long, default_value = "labelwerk.toml")]
    pub config: PathBuf,

    /// Address to serve HTTP on.
    #[arg(long)]
    pub listen: Option<String>,

    /// Network printer, `host[:port]`.
    #[arg(long, env = "IPL_PRINTER")]
    pub host: Option<String>,

    /// Serial device of the printer.
    #[arg(long, env = "IPL_PORT")]
    pub port: Option<String>,

    /// Connection type: `net` or `serial`.
    #[arg(long, env = "IPL_CTYPE")]
    pub ctype: Option<String>,

    /// Debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the liveness tones after connecting.
    #[arg(long)]
    pub no_beep: bool,

    /// Never touch the printer; simulate transmission.
    #[arg(long)]
    pub dry_run: bool,

    /// Image database path.
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl Cli {
    /// Apply the flags on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(host) = &self.host {
            config.printer.host = host.clone();
        }
        if let Some(port) = &self.port {
            config.printer.port = port.clone();
        }
        if let Some(ctype) = &self.ctype {
            config.printer.transport = ctype.parse::<TransportKind>()?;
        }
        if self.no_beep {
            config.printer.beep = false;
        }
        if self.dry_run {
            config.pipeline.dry_run = true;
        }
        if let Some(database) = &self.database {
            config.storage.database = database.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelwerk_core::error::LabelwerkError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("labelwerk").chain(args.iter().copied()))
            .expect("valid flags")
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "--listen",
            "127.0.0.1:9000",
            "--ctype",
            "serial",
            "--port",
            "/dev/ttyUSB0",
            "--no-beep",
            "--dry-run",
        ]);
        let mut config = AppConfig::default();
        cli.apply(&mut config).expect("apply");

        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.printer.transport, TransportKind::Serial);
        assert_eq!(config.printer.port, "/dev/ttyUSB0");
        assert!(!config.printer.beep);
        assert!(config.pipeline.dry_run);
    }

    #[test]
    fn unknown_connection_type_is_rejected() {
        let cli = parse(&["--ctype", "usb"]);
        let err = cli.apply(&mut AppConfig::default()).unwrap_err();
        assert!(matches!(err, LabelwerkError::UnknownTransport(_)));
    }

    #[test]
    fn config_path_has_a_default() {
        let cli = parse(&[]);
        assert_eq!(cli.config, PathBuf::from("labelwerk.toml"));
        assert!(!cli.verbose);
    }
}
