// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label printer device: raster upload, page feed, and tones.

use async_trait::async_trait;
use image::DynamicImage;
use tracing::{debug, info, instrument};

use labelwerk_core::error::{LabelwerkError, Result};

use crate::link::Link;
use crate::protocol::{self, PAGE_FEED, Raster};

/// Default upper bound on a single raster band.
pub const DEFAULT_CHUNK_BYTES: usize = 4096;

/// A beeper tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub freq_hz: u32,
    pub duration_ms: u32,
}

/// Played once after connecting to show the device is alive.
pub const LIVENESS_SIGNAL: [Tone; 2] = [
    Tone {
        freq_hz: 850,
        duration_ms: 200,
    },
    Tone {
        freq_hz: 950,
        duration_ms: 200,
    },
];

/// Operations the pipeline needs from a connected printer.
#[async_trait]
pub trait LabelPrinter: Send {
    /// Upload `image` in bounded-size pieces.
    async fn print_chunked(&mut self, image: &DynamicImage) -> Result<()>;

    /// Feed `count` labels.
    async fn page_feed(&mut self, count: u32) -> Result<()>;

    async fn beep(&mut self, tones: &[Tone]) -> Result<()>;
}

/// Printer speaking Fingerprint-style commands over a [`Link`].
pub struct FingerprintPrinter<L> {
    link: L,
    chunk_bytes: usize,
}

impl<L: Link> FingerprintPrinter<L> {
    pub fn new(link: L, chunk_bytes: usize) -> Self {
        Self {
            link,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.link
            .write_all(bytes)
            .await
            .map_err(|e| LabelwerkError::Transport(e.to_string()))
    }

    async fn flush(&mut self) -> Result<()> {
        self.link
            .flush()
            .await
            .map_err(|e| LabelwerkError::Transport(e.to_string()))
    }

    pub fn into_link(self) -> L {
        self.link
    }
}

#[async_trait]
impl<L: Link> LabelPrinter for FingerprintPrinter<L> {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    async fn print_chunked(&mut self, image: &DynamicImage) -> Result<()> {
        let raster = Raster::from_image(image);
        let total = raster.bits.len();
        let mut sent = 0usize;

        for band in raster.bands(self.chunk_bytes) {
            self.send(&band.header()).await?;
            self.send(band.payload).await?;
            sent += band.payload.len();
            debug!(y = band.y, sent, total, "band uploaded");
        }
        self.flush().await?;

        info!(bytes = total, "raster uploaded");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn page_feed(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            self.send(PAGE_FEED).await?;
        }
        self.flush().await
    }

    async fn beep(&mut self, tones: &[Tone]) -> Result<()> {
        for tone in tones {
            self.send(&protocol::sound(tone.freq_hz, tone.duration_ms))
                .await?;
        }
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Link that records writes and can be told to fail.
    #[derive(Default)]
    struct MemoryLink {
        written: Vec<u8>,
        writes: usize,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl Link for MemoryLink {
        async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.fail_after.is_some_and(|n| self.writes >= n) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
            }
            self.writes += 1;
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn text(printer: FingerprintPrinter<MemoryLink>) -> String {
        String::from_utf8_lossy(&printer.into_link().written).into_owned()
    }

    #[tokio::test]
    async fn page_feed_repeats_per_label() {
        let mut printer = FingerprintPrinter::new(MemoryLink::default(), 64);
        printer.page_feed(2).await.expect("feed");
        assert_eq!(text(printer), "PF\r\nPF\r\n");
    }

    #[tokio::test]
    async fn zero_page_feeds_write_nothing() {
        let mut printer = FingerprintPrinter::new(MemoryLink::default(), 64);
        printer.page_feed(0).await.expect("feed");
        assert!(text(printer).is_empty());
    }

    #[tokio::test]
    async fn liveness_signal_plays_two_tones() {
        let mut printer = FingerprintPrinter::new(MemoryLink::default(), 64);
        printer.beep(&LIVENESS_SIGNAL).await.expect("beep");
        assert_eq!(text(printer), "SOUND 850,200\r\nSOUND 950,200\r\n");
    }

    #[tokio::test]
    async fn raster_is_sent_in_positioned_bands() {
        // 16 px wide -> 2 bytes per row; 8-byte bands hold 4 rows.
        let image = DynamicImage::new_luma8(16, 10);
        let mut printer = FingerprintPrinter::new(MemoryLink::default(), 8);
        printer.print_chunked(&image).await.expect("print");

        let link = printer.into_link();
        assert_eq!(link.writes, 6);
        let out = String::from_utf8_lossy(&link.written).into_owned();
        assert!(out.starts_with("PRPOS 0,0\r\nPRBUF 8\r\n"));
        assert!(out.contains("PRPOS 0,4\r\nPRBUF 8\r\n"));
        assert!(out.contains("PRPOS 0,8\r\nPRBUF 4\r\n"));
    }

    #[tokio::test]
    async fn write_failure_is_a_transport_error() {
        let link = MemoryLink {
            fail_after: Some(1),
            ..MemoryLink::default()
        };
        let mut printer = FingerprintPrinter::new(link, 8);
        let err = printer
            .print_chunked(&DynamicImage::new_luma8(16, 10))
            .await
            .err()
            .expect("second write fails");
        assert_eq!(err.message(), "broken pipe");
    }
}
