// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR stamp generator — encodes the uploaded filename with the smallest
// symbol that fits and renders it straight into a grayscale buffer.

use enmarca_core::error::{EnmarcaError, Result};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use tracing::{debug, instrument};

/// Renders payload strings to QR rasters.
#[derive(Debug, Clone)]
pub struct QrStampGenerator {
    /// Edge length of one module in pixels.
    module_px: u32,
    /// Light modules surrounding the symbol on each side.
    border_modules: u32,
}

impl Default for QrStampGenerator {
    fn default() -> Self {
        Self {
            module_px: 10,
            border_modules: 0,
        }
    }
}

impl QrStampGenerator {
    pub fn new(module_px: u32, border_modules: u32) -> Self {
        Self {
            module_px: module_px.max(1),
            border_modules,
        }
    }

    /// Encode `payload` at error-correction level L and rasterise it.
    ///
    /// The output depends only on the payload and the generator settings.
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub fn generate(&self, payload: &str) -> Result<GrayImage> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::L)
            .map_err(|err| EnmarcaError::StampGeneration(format!("QR encoding failed: {}", err)))?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side_modules = modules + 2 * self.border_modules;
        let side_px = side_modules * self.module_px;

        let image = GrayImage::from_fn(side_px, side_px, |x, y| {
            let mx = (x / self.module_px) as i64 - self.border_modules as i64;
            let my = (y / self.module_px) as i64 - self.border_modules as i64;
            let inside = (0..modules as i64).contains(&mx) && (0..modules as i64).contains(&my);
            let dark = inside && colors[(my as u32 * modules + mx as u32) as usize] == Color::Dark;
            if dark { Luma([0u8]) } else { Luma([255u8]) }
        });

        debug!(modules, side_px, "QR stamp rendered");
        Ok(image)
    }
}
