// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Threshold kernels behind the dither filters.

use image::{DynamicImage, GrayImage, Luma, Rgba};
use rand::Rng;

/// A square ordered-dither threshold matrix.
#[derive(Debug)]
pub struct ThresholdMatrix {
    pub size: u32,
    /// Row-major cell ranks in `0..size*size`.
    pub cells: &'static [u8],
}

impl ThresholdMatrix {
    /// Threshold in `(0, 1)` for pixel `(x, y)`.
    fn threshold(&self, x: u32, y: u32) -> f32 {
        let rank = self.cells[((y % self.size) * self.size + x % self.size) as usize];
        (f32::from(rank) + 0.5) / (self.size * self.size) as f32
    }
}

pub const CLUSTERED_DOT_4X4: ThresholdMatrix = ThresholdMatrix {
    size: 4,
    cells: &[
        12, 5, 6, 13, //
        4, 0, 1, 7, //
        11, 3, 2, 8, //
        15, 10, 9, 14,
    ],
};

pub const BAYER_3X3: ThresholdMatrix = ThresholdMatrix {
    size: 3,
    cells: &[
        0, 7, 3, //
        6, 5, 2, //
        4, 1, 8,
    ],
};

/// Relative luminance in `[0, 1]`, with transparency flattened onto white.
fn luminance(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, a] = pixel.0;
    let l = (0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b)) / 255.0;
    let alpha = f32::from(a) / 255.0;
    l * alpha + (1.0 - alpha)
}

fn quantize(value: f32) -> Luma<u8> {
    if value >= 0.5 { Luma([255]) } else { Luma([0]) }
}

/// Ordered dither: shift each pixel by its matrix cell before thresholding.
pub(crate) fn ordered(image: &DynamicImage, matrix: &ThresholdMatrix, strength: f32) -> DynamicImage {
    let rgba = image.to_rgba8();
    let out = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let bias = 0.5 - matrix.threshold(x, y);
        quantize(luminance(rgba.get_pixel(x, y)) + strength * bias)
    });
    DynamicImage::ImageLuma8(out)
}

/// Threshold after adding uniform noise from `[min, max)`, centred on zero.
pub(crate) fn random_noise(
    image: &DynamicImage,
    min: f32,
    max: f32,
    rng: &mut impl Rng,
) -> DynamicImage {
    let rgba = image.to_rgba8();
    let centre = (min + max) / 2.0;
    let out = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let noise = rng.random_range(min..max) - centre;
        quantize(luminance(rgba.get_pixel(x, y)) + noise)
    });
    DynamicImage::ImageLuma8(out)
}
