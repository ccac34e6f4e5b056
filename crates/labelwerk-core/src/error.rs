// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Labelwerk.

use thiserror::Error;

/// Top-level error type for all Labelwerk operations.
#[derive(Debug, Error)]
pub enum LabelwerkError {
    // -- Admission --
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("print queue full")]
    QueueFull,

    #[error("print pipeline is not running")]
    PipelineStopped,

    // -- Image processing --
    #[error("image processing failed: {0}")]
    Image(String),

    // -- Printer --
    #[error("printer transport error: {0}")]
    Transport(String),

    #[error("unknown connection type '{0}', choose between 'net' and 'serial'")]
    UnknownTransport(String),

    #[error("giving up after {attempts} failed connection attempts: {last_error}")]
    ConnectionFatal { attempts: u32, last_error: String },

    #[error("printer connected but did not respond: {0}")]
    DeviceUnresponsive(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LabelwerkError {
    /// The error text without its category prefix, as shown in job status.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidRequest(msg)
            | Self::Image(msg)
            | Self::Transport(msg)
            | Self::DeviceUnresponsive(msg)
            | Self::Database(msg)
            | Self::NotFound(msg)
            | Self::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error ends the process rather than a single job or request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFatal { .. } | Self::DeviceUnresponsive(_) | Self::UnknownTransport(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LabelwerkError>;
