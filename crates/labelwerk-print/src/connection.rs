// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer connection setup with bounded retries.
//
// One connection is opened at startup and kept for the life of the process.
// Failed attempts are retried after a fixed backoff; once the failure budget
// is spent the error is fatal. A connected device must then answer the
// liveness signal.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use labelwerk_core::config::PrinterConfig;
use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::TransportKind;

use crate::link::{SerialLink, TcpLink};
use crate::printer::{FingerprintPrinter, LIVENESS_SIGNAL, LabelPrinter};

/// Opens a printer connection of a given kind.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, kind: TransportKind, address: &str) -> Result<Box<dyn LabelPrinter>>;
}

/// Dials real devices over TCP or a serial line.
#[derive(Debug, Clone)]
pub struct DeviceDialer {
    pub chunk_bytes: usize,
    pub baud_rate: u32,
    pub connect_timeout: Duration,
}

impl DeviceDialer {
    pub fn from_config(config: &PrinterConfig) -> Self {
        Self {
            chunk_bytes: config.chunk_bytes,
            baud_rate: config.baud_rate,
            connect_timeout: config.connect_timeout(),
        }
    }
}

#[async_trait]
impl Dialer for DeviceDialer {
    async fn dial(&self, kind: TransportKind, address: &str) -> Result<Box<dyn LabelPrinter>> {
        let printer: Box<dyn LabelPrinter> = match kind {
            TransportKind::Network => {
                let link = TcpLink::connect(address, self.connect_timeout).await?;
                Box::new(FingerprintPrinter::new(link, self.chunk_bytes))
            }
            TransportKind::Serial => {
                let link = SerialLink::open(address, self.baud_rate)?;
                Box::new(FingerprintPrinter::new(link, self.chunk_bytes))
            }
        };
        Ok(printer)
    }
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Fixed-backoff retry budget for connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause after every failed attempt.
    pub backoff: Duration,
    /// Failures tolerated; one more is fatal.
    pub max_failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            max_failures: 3,
        }
    }
}

/// Outcome of counting another failure against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again.
    Retry,
    /// Budget spent.
    Exhausted,
}

impl RetryPolicy {
    pub fn from_config(config: &PrinterConfig) -> Self {
        Self {
            backoff: config.backoff(),
            max_failures: config.max_connect_failures,
        }
    }

    /// Decide after `failures` consecutive failed attempts.
    pub fn after_failure(&self, failures: u32) -> RetryDecision {
        if failures > self.max_failures {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry
        }
    }
}

// ---------------------------------------------------------------------------
// Connection manager
// ---------------------------------------------------------------------------

/// A live printer and the failed attempts it took to reach it.
pub struct Established {
    pub printer: Box<dyn LabelPrinter>,
    pub failures: u32,
}

pub struct ConnectionManager<D> {
    dialer: D,
    kind: TransportKind,
    address: String,
    policy: RetryPolicy,
    liveness_check: bool,
}

impl ConnectionManager<DeviceDialer> {
    /// Manager for the printer described by `config`.
    pub fn from_config(config: &PrinterConfig) -> Result<Self> {
        let address = config.address()?.to_owned();
        Ok(Self::new(
            DeviceDialer::from_config(config),
            config.transport,
            address,
            RetryPolicy::from_config(config),
            config.beep,
        ))
    }
}

impl<D: Dialer> ConnectionManager<D> {
    pub fn new(
        dialer: D,
        kind: TransportKind,
        address: impl Into<String>,
        policy: RetryPolicy,
        liveness_check: bool,
    ) -> Self {
        Self {
            dialer,
            kind,
            address: address.into(),
            policy,
            liveness_check,
        }
    }

    /// Connect, retrying within the policy, then run the liveness check.
    #[instrument(skip(self), fields(kind = %self.kind, address = %self.address))]
    pub async fn establish(&self) -> Result<Established> {
        let mut failures = 0u32;
        let mut printer = loop {
            match self.dialer.dial(self.kind, &self.address).await {
                Ok(printer) => break printer,
                Err(err) => {
                    warn!(attempt = failures + 1, error = %err, "printer connection failed");
                    tokio::time::sleep(self.policy.backoff).await;
                    failures += 1;
                    if self.policy.after_failure(failures) == RetryDecision::Exhausted {
                        error!(failures, "giving up on printer connection");
                        return Err(LabelwerkError::ConnectionFatal {
                            attempts: failures,
                            last_error: err.message(),
                        });
                    }
                    debug!(failures, "retrying printer connection");
                }
            }
        };
        info!(failures, "printer connected");

        if self.liveness_check {
            printer.beep(&LIVENESS_SIGNAL).await.map_err(|e| {
                error!(error = %e, "printer did not accept the liveness signal");
                LabelwerkError::DeviceUnresponsive(e.message())
            })?;
            debug!("liveness signal played");
        }

        Ok(Established { printer, failures })
    }
}
