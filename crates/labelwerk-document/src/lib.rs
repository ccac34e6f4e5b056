// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// labelwerk-document: Label image preparation for the Labelwerk print server.
//
// Provides the geometric transforms applied to every upload (quarter-turn
// rotation, stretch or fit resize, centering on a white canvas) and the
// black/white dither filters selected per job.

pub mod dither;
pub mod image;

pub use dither::Filter;
pub use image::processor::{ImageHeader, ImageProcessor, encode_png, probe_header};
