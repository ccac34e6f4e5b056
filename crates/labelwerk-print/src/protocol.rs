// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fingerprint-style command framing for label printers.
//
// Images travel as 1-bit rasters: one bit per pixel, most significant bit
// first, a set bit printing a dark dot, each row padded to whole bytes.
// A raster is split into bands of whole rows; each band is positioned with
// PRPOS and uploaded with PRBUF.

use image::DynamicImage;

/// Luminance below which a pixel prints dark.
const DARK_THRESHOLD: u8 = 128;

/// Feed one label.
pub const PAGE_FEED: &[u8] = b"PF\r\n";

/// A packed 1-bit raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
    pub bits: Vec<u8>,
}

impl Raster {
    /// Threshold `image`, flattening transparency onto white.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let stride = (width as usize).div_ceil(8);
        let mut bits = vec![0u8; stride * height as usize];

        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let luma = (u32::from(r) * 2126 + u32::from(g) * 7152 + u32::from(b) * 722) / 10_000;
            // Blend onto white by alpha.
            let luma = (luma * u32::from(a) + 255 * (255 - u32::from(a))) / 255;
            if luma < u32::from(DARK_THRESHOLD) {
                let index = y as usize * stride + x as usize / 8;
                bits[index] |= 0x80 >> (x % 8);
            }
        }

        Self {
            width,
            height,
            stride,
            bits,
        }
    }

    /// Split into bands of whole rows, each at most `max_bytes` long.
    /// A band always holds at least one row.
    pub fn bands(&self, max_bytes: usize) -> impl Iterator<Item = Band<'_>> {
        let rows_per_band = if self.stride == 0 {
            self.height.max(1) as usize
        } else {
            (max_bytes / self.stride).max(1)
        };
        let band_bytes = (rows_per_band * self.stride).max(1);
        self.bits
            .chunks(band_bytes)
            .enumerate()
            .map(move |(i, payload)| Band {
                y: (i * rows_per_band) as u32,
                payload,
            })
    }
}

/// A run of whole raster rows starting at row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band<'a> {
    pub y: u32,
    pub payload: &'a [u8],
}

impl Band<'_> {
    /// Position and upload header preceding the payload.
    pub fn header(&self) -> Vec<u8> {
        format!("PRPOS 0,{}\r\nPRBUF {}\r\n", self.y, self.payload.len()).into_bytes()
    }
}

/// Play a tone of `freq_hz` for `duration_ms`.
pub fn sound(freq_hz: u32, duration_ms: u32) -> Vec<u8> {
    format!("SOUND {freq_hz},{duration_ms}\r\n").into_bytes()
}
