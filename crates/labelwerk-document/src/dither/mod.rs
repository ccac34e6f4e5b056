// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dither filters: reduce a label image to the printer's black/white palette.
//
// Filters are selected by name from a small fixed set. Any name outside that
// set resolves to `Filter::Identity`, which returns its input unchanged.

mod kernels;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use kernels::{BAYER_3X3, CLUSTERED_DOT_4X4, ThresholdMatrix};

/// A named image-quantization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Pass-through for unrecognized names.
    Identity,
    /// Ordered dither with a 4x4 clustered-dot matrix (`o4x4`).
    ClusteredDot4x4,
    /// Threshold with per-pixel random noise (`noise`).
    RandomNoise,
    /// Ordered dither with a 3x3 Bayer matrix (`bayer`).
    Bayer3x3,
}

/// Noise range added to luminance by `Filter::RandomNoise`.
const NOISE_RANGE: (f32, f32) = (0.1, 0.5);

/// Strength of the Bayer ordered dither.
const BAYER_STRENGTH: f32 = 0.6;

impl Filter {
    /// Resolve the `dither` request option.
    ///
    /// An absent or blank name selects no filter at all; any other name
    /// selects a filter, falling back to `Identity`.
    pub fn resolve(name: Option<&str>) -> Option<Self> {
        let name = name.map(str::trim).filter(|n| !n.is_empty())?;
        let filter = match name {
            "o4x4" => Self::ClusteredDot4x4,
            "noise" => Self::RandomNoise,
            "bayer" => Self::Bayer3x3,
            other => {
                debug!(name = other, "unknown dither name, using identity");
                Self::Identity
            }
        };
        Some(filter)
    }

    /// The request name of this filter (`identity` for the fallback).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::ClusteredDot4x4 => "o4x4",
            Self::RandomNoise => "noise",
            Self::Bayer3x3 => "bayer",
        }
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Identity => image,
            Self::ClusteredDot4x4 => kernels::ordered(&image, &CLUSTERED_DOT_4X4, 1.0),
            Self::Bayer3x3 => kernels::ordered(&image, &BAYER_3X3, BAYER_STRENGTH),
            Self::RandomNoise => {
                kernels::random_noise(&image, NOISE_RANGE.0, NOISE_RANGE.1, &mut rand::rng())
            }
        }
    }
}
