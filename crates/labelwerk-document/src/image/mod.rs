// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: header probing, rotation, resize, centering, and PNG output.

pub mod processor;

pub use processor::{ImageHeader, ImageProcessor, probe_header};
