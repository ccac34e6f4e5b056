// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor. Fits an uploaded image onto a label with quarter-turn
// rotation, stretch or aspect-preserving resize, centering on a white
// canvas, and PNG encoding. Operates on in-memory images using the `image`
// crate.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Limits, Rgba, RgbaImage};
use labelwerk_core::LabelSize;
use labelwerk_core::error::LabelwerkError;
use tracing::{debug, info, instrument};

/// Resampling filter used for every resize.
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Canvas colour behind centered images.
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Widest decoded pixel layout the `image` crate produces (RGBA, f32).
const MAX_BYTES_PER_PIXEL: u64 = 16;

/// Format and dimensions read from an image header without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageHeader {
    /// Short lowercase tag stored alongside the image bytes (`png`, `jpeg`, ...).
    pub fn format_tag(&self) -> String {
        format_tag(self.format)
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Lowercase tag for an `ImageFormat`.
pub fn format_tag(format: ImageFormat) -> String {
    format!("{format:?}").to_ascii_lowercase()
}

/// Read the format and dimensions of an encoded image.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn probe_header(data: &[u8]) -> Result<ImageHeader, LabelwerkError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|err| LabelwerkError::Image(format!("failed to read image: {err}")))?;
    let format = reader
        .format()
        .ok_or_else(|| LabelwerkError::Image("unknown image format".into()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| LabelwerkError::Image(err.to_string()))?;
    Ok(ImageHeader {
        format,
        width,
        height,
    })
}

/// Whether a quarter turn is needed to match the label's orientation.
pub fn needs_rotation(label: LabelSize, width: u32, height: u32) -> bool {
    label.is_landscape() != (width > height)
}

/// Output size of an aspect-preserving resize into `label`.
///
/// The axis with the larger source-to-label ratio binds: it is set to the
/// label edge and the other axis follows proportionally.
pub fn fit_dimensions(width: u32, height: u32, label: LabelSize) -> (u32, u32) {
    let px = f64::from(width) / f64::from(label.width);
    let py = f64::from(height) / f64::from(label.height);
    if px > py {
        let h = (f64::from(height) / px).round().max(1.0) as u32;
        (label.width, h)
    } else {
        let w = (f64::from(width) / py).round().max(1.0) as u32;
        (w, label.height)
    }
}

/// Top-left placement of a `width` x `height` image on the label canvas.
///
/// Axes that are not centered are placed at 0. Halves use integer division,
/// so an oversized image gets a negative offset and is clipped evenly.
pub fn center_offsets(
    label: LabelSize,
    width: u32,
    height: u32,
    horizontal: bool,
    vertical: bool,
) -> (i64, i64) {
    let x = if horizontal {
        i64::from(label.width / 2) - i64::from(width / 2)
    } else {
        0
    };
    let y = if vertical {
        i64::from(label.height / 2) - i64::from(height / 2)
    } else {
        0
    };
    (x, y)
}

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (PNG, JPEG, GIF, BMP, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, LabelwerkError> {
        let img = image::load_from_memory(data)
            .map_err(|err| LabelwerkError::Image(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Decode raw bytes, refusing images with more than `max_pixels` pixels
    /// before any pixel buffer is allocated.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes_within(data: &[u8], max_pixels: u64) -> Result<Self, LabelwerkError> {
        let header = probe_header(data)?;
        if header.pixels() > max_pixels {
            return Err(LabelwerkError::Image(format!(
                "{}x{} image exceeds {max_pixels} pixels",
                header.width, header.height
            )));
        }

        let mut limits = Limits::default();
        limits.max_alloc = Some(max_pixels.saturating_mul(MAX_BYTES_PER_PIXEL));
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| LabelwerkError::Image(format!("failed to read image: {err}")))?;
        reader.limits(limits);
        let img = reader
            .decode()
            .map_err(|err| LabelwerkError::Image(format!("failed to decode image: {err}")))?;
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_quarter(self) -> Self {
        Self {
            image: self.image.rotate270(),
        }
    }

    /// Rotate a quarter turn if the image and label orientations differ.
    /// Returns whether a rotation happened.
    #[instrument(skip(self), fields(label = %label))]
    pub fn orient_to(self, label: LabelSize) -> (Self, bool) {
        if needs_rotation(label, self.width(), self.height()) {
            info!(
                width = self.width(),
                height = self.height(),
                "Rotating image to label orientation"
            );
            (self.rotate_quarter(), true)
        } else {
            (self, false)
        }
    }

    /// Resize to exactly the label size, ignoring aspect ratio.
    #[instrument(skip(self), fields(label = %label))]
    pub fn resize_stretch(self, label: LabelSize) -> Self {
        info!(
            from_w = self.width(),
            from_h = self.height(),
            "Stretching image to label"
        );
        Self {
            image: self
                .image
                .resize_exact(label.width, label.height, RESIZE_FILTER),
        }
    }

    /// Resize to fit within the label, preserving aspect ratio.
    #[instrument(skip(self), fields(label = %label))]
    pub fn resize_fit(self, label: LabelSize) -> Self {
        let (w, h) = fit_dimensions(self.width(), self.height(), label);
        info!(
            from_w = self.width(),
            from_h = self.height(),
            to_w = w,
            to_h = h,
            "Fitting image to label"
        );
        Self {
            image: self.image.resize_exact(w, h, RESIZE_FILTER),
        }
    }

    /// Composite onto a white label-sized canvas, centering on the requested
    /// axes.
    #[instrument(skip(self), fields(label = %label))]
    pub fn center_on(self, label: LabelSize, horizontal: bool, vertical: bool) -> Self {
        let (x, y) = center_offsets(label, self.width(), self.height(), horizontal, vertical);
        debug!(x, y, "Centering image on label canvas");

        let mut canvas = RgbaImage::from_pixel(label.width, label.height, WHITE);
        imageops::overlay(&mut canvas, &self.image.to_rgba8(), x, y);
        Self {
            image: DynamicImage::ImageRgba8(canvas),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, LabelwerkError> {
        encode_png(&self.image)
    }
}

/// Encode a `DynamicImage` as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, LabelwerkError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| LabelwerkError::Image(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}
