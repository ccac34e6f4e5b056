// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Labelwerk label print server.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LabelwerkError;

/// Unique identifier for a print job. Doubles as the status-stream key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = LabelwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| LabelwerkError::InvalidRequest(format!("invalid job id '{s}': {e}")))
    }
}

/// Unique identifier for a stored image record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ImageId {
    type Err = LabelwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| LabelwerkError::InvalidRequest(format!("invalid image id '{s}': {e}")))
    }
}

/// The processed label of a job is stored under the job's own id.
impl From<JobId> for ImageId {
    fn from(id: JobId) -> Self {
        Self(id.0)
    }
}

/// Target label size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSize {
    pub width: u32,
    pub height: u32,
}

impl LabelSize {
    /// Largest accepted edge length (31-bit positive range).
    pub const MAX_EDGE: u32 = i32::MAX as u32;

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Wider than tall. A square label counts as portrait.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Canvas area in pixels.
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for LabelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Per-job layout options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub resize: bool,
    /// Ignore aspect ratio when resizing.
    pub stretch: bool,
    pub rotate: bool,
    pub center_horizontal: bool,
    pub center_vertical: bool,
    /// Accepted from clients but has no effect yet.
    pub tiling: bool,
}

impl JobOptions {
    pub fn centers(&self) -> bool {
        self.center_horizontal || self.center_vertical
    }
}

/// Physical link to the label printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Raw TCP socket to a networked printer.
    #[serde(rename = "net", alias = "network")]
    Network,
    /// Serial line (USB or RS-232).
    #[serde(rename = "serial")]
    Serial,
}

impl TransportKind {
    /// How long a print takes when hardware is disabled.
    pub fn simulated_print_delay(&self) -> Duration {
        match self {
            Self::Network => Duration::from_secs(5),
            Self::Serial => Duration::from_secs(12),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "net",
            Self::Serial => "serial",
        }
    }
}

impl FromStr for TransportKind {
    type Err = LabelwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "net" | "network" => Ok(Self::Network),
            "serial" => Ok(Self::Serial),
            other => Err(LabelwerkError::UnknownTransport(other.to_owned())),
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image record in the blob store.
///
/// Uploads are stored as-is ("unprocessed"); the pipeline output is stored
/// as a separate "processed" record and the two are cross-linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: ImageId,
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Format tag, e.g. `png` or `jpeg`.
    pub format: String,
    pub public: bool,
    /// Original upload filename, if the client sent one.
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of `data`, lowercase hex.
    pub digest: String,
    pub is_processed: bool,
    /// Set on processed records: the upload this was rendered from.
    pub unprocessed: Option<ImageId>,
    /// Set on unprocessed records once the pipeline has saved its output.
    pub processed: Option<ImageId>,
}

impl StoredImage {
    /// A raw upload under a fresh id.
    pub fn unprocessed(data: Vec<u8>, format: &str, public: bool, name: Option<String>) -> Self {
        let digest = crate::integrity::hash_bytes(&data);
        Self {
            id: ImageId::new(),
            data,
            format: format.to_owned(),
            public,
            name,
            created_at: Utc::now(),
            digest,
            is_processed: false,
            unprocessed: None,
            processed: None,
        }
    }

    /// Pipeline output for `original`, stored under `id`.
    pub fn processed(
        id: ImageId,
        data: Vec<u8>,
        format: &str,
        public: bool,
        name: Option<String>,
        original: ImageId,
    ) -> Self {
        let digest = crate::integrity::hash_bytes(&data);
        Self {
            id,
            data,
            format: format.to_owned(),
            public,
            name,
            created_at: Utc::now(),
            digest,
            is_processed: true,
            unprocessed: Some(original),
            processed: None,
        }
    }

    /// MIME type derived from the format tag.
    pub fn content_type(&self) -> &'static str {
        match self.format.as_str() {
            "png" => "image/png",
            "jpeg" | "jpg" => "image/jpeg",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            "tiff" => "image/tiff",
            "pnm" => "image/x-portable-anymap",
            _ => "application/octet-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_job_id_is_invalid_request() {
        let err = "not-a-uuid".parse::<JobId>().unwrap_err();
        assert!(matches!(err, LabelwerkError::InvalidRequest(_)));
    }

    #[test]
    fn square_label_is_portrait() {
        assert!(!LabelSize::new(200, 200).is_landscape());
        assert!(LabelSize::new(400, 200).is_landscape());
    }

    #[test]
    fn pixel_count_does_not_overflow() {
        let label = LabelSize::new(LabelSize::MAX_EDGE, LabelSize::MAX_EDGE);
        assert_eq!(label.pixels(), u64::from(LabelSize::MAX_EDGE).pow(2));
        assert_eq!(LabelSize::new(400, 200).pixels(), 80_000);
    }

    #[test]
    fn transport_kind_accepts_both_spellings() {
        assert_eq!("net".parse::<TransportKind>().unwrap(), TransportKind::Network);
        assert_eq!("Network".parse::<TransportKind>().unwrap(), TransportKind::Network);
        assert_eq!("serial".parse::<TransportKind>().unwrap(), TransportKind::Serial);
        assert!(matches!(
            "usb".parse::<TransportKind>(),
            Err(LabelwerkError::UnknownTransport(_))
        ));
    }

    #[test]
    fn serial_simulation_is_slower_than_network() {
        assert!(
            TransportKind::Serial.simulated_print_delay()
                > TransportKind::Network.simulated_print_delay()
        );
    }

    #[test]
    fn processed_record_links_back_to_original() {
        let original = StoredImage::unprocessed(vec![1, 2, 3], "png", false, None);
        let job = JobId::new();
        let processed =
            StoredImage::processed(job.into(), vec![4, 5], "png", false, None, original.id);
        assert!(processed.is_processed);
        assert_eq!(processed.id, ImageId::from(job));
        assert_eq!(processed.unprocessed, Some(original.id));
        assert_ne!(processed.digest, original.digest);
    }

    #[test]
    fn content_type_falls_back_to_octet_stream() {
        let mut img = StoredImage::unprocessed(Vec::new(), "png", true, None);
        assert_eq!(img.content_type(), "image/png");
        img.format = "pcx".into();
        assert_eq!(img.content_type(), "application/octet-stream");
    }
}
