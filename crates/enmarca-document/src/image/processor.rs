// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, resample and flatten stamp rasters before they
// are embedded in a page. Operates on in-memory images using the `image`
// crate; nothing touches the filesystem.

use enmarca_core::error::EnmarcaError;
use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, instrument};

/// Processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor`, enabling
/// method chaining:
///
/// ```ignore
/// let stamp = ImageProcessor::from_bytes(&png)?
///     .resize_exact(604, 208)
///     .into_gray_on_white();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (PNG, JPEG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, EnmarcaError> {
        let img = image::load_from_memory(data).map_err(|err| {
            EnmarcaError::StampGeneration(format!("failed to decode stamp raster: {}", err))
        })?;
        debug!(width = img.width(), height = img.height(), "Raster decoded");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Transformations ------------------------------------------------------

    /// Resize to exactly `width` x `height`, ignoring aspect ratio. Uses
    /// Lanczos3 so thin bars stay crisp when scaled up.
    #[instrument(skip(self))]
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if self.image.width() == width && self.image.height() == height {
            return self;
        }
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            "Resampling raster"
        );
        let resized =
            self.image
                .resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Composite any transparency over white and return 8-bit luma.
    pub fn into_gray_on_white(self) -> GrayImage {
        let rgba = self.image.to_rgba8();
        GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
            let alpha = a as u32;
            let blended = (luma * alpha + 255 * (255 - alpha)) / 255;
            Luma([blended as u8])
        })
    }
}
