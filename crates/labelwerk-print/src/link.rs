// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Byte links to a printer: raw TCP (port 9100) or a serial line.

use std::time::Duration;

use async_trait::async_trait;
use serial2_tokio::SerialPort;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, instrument};

use labelwerk_core::error::{LabelwerkError, Result};

/// Default raw TCP port (JetDirect).
pub const RAW_PORT: u16 = 9100;

/// An open, write-only byte channel to the device.
#[async_trait]
pub trait Link: Send {
    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    async fn flush(&mut self) -> std::io::Result<()>;
}

/// A [`Link`] over any tokio writer.
#[derive(Debug)]
pub struct StreamLink<S> {
    stream: S,
    peer: String,
}

pub type TcpLink = StreamLink<TcpStream>;
pub type SerialLink = StreamLink<SerialPort>;

impl<S> StreamLink<S> {
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
        }
    }

    /// Address or device path of the other end.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

#[async_trait]
impl<S> Link for StreamLink<S>
where
    S: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        AsyncWriteExt::write_all(&mut self.stream, bytes).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        AsyncWriteExt::flush(&mut self.stream).await
    }
}

/// `host` with the raw port appended when it carries none.
pub fn with_default_port(host: &str) -> String {
    if host.parse::<std::net::SocketAddr>().is_ok() {
        return host.to_owned();
    }
    if host.parse::<std::net::Ipv6Addr>().is_ok() {
        return format!("[{host}]:{RAW_PORT}");
    }
    match host.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => host.to_owned(),
        _ => format!("{host}:{RAW_PORT}"),
    }
}

impl StreamLink<TcpStream> {
    /// Connect to a networked printer at `host[:port]`.
    #[instrument(skip(timeout))]
    pub async fn connect(host: &str, timeout: Duration) -> Result<Self> {
        let addr = with_default_port(host);
        info!(addr = %addr, "connecting via raw TCP");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                LabelwerkError::Transport(format!(
                    "connection to {addr} timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| LabelwerkError::Transport(format!("connect to {addr}: {e}")))?;

        stream
            .set_nodelay(true)
            .map_err(|e| LabelwerkError::Transport(format!("set TCP_NODELAY: {e}")))?;

        Ok(Self::new(stream, addr))
    }
}

impl StreamLink<SerialPort> {
    /// Open the serial device at `path`.
    #[instrument]
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = SerialPort::open(path, baud_rate)
            .map_err(|e| LabelwerkError::Transport(format!("open serial port {path}: {e}")))?;
        info!("serial port opened");
        Ok(Self::new(port, path))
    }
}
