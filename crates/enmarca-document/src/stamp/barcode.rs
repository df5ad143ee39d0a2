// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Barcode stamp generator — Code-128 rendered vector-first.
//
// Tier 1 draws the symbol as SVG and rasterises it with resvg at the target
// density. Tier 2 asks the bitmap encoder for a PNG and resamples it with
// Lanczos3. Neither tier writes to disk and neither prints the text below
// the bars. When both fail the caller gets `None` and carries on without a
// barcode.

use barcoders::generators::image::Image as BitmapGenerator;
use barcoders::generators::svg::SVG;
use barcoders::sym::code128::Code128;
use enmarca_core::error::{EnmarcaError, Result};
use image::{DynamicImage, GrayImage, RgbaImage};
use resvg::{tiny_skia, usvg};
use tracing::{debug, instrument, warn};

use crate::image::ImageProcessor;

/// Code-128 start character selecting code set B (digits and upper case).
const CODE_SET_B: char = '\u{0181}';

/// Bar height requested from the encoders before scaling.
const SOURCE_BAR_HEIGHT: u32 = 80;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Turns a folio payload into a barcode raster. `None` means the folio is
/// printed without a barcode.
pub trait BarcodeRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Option<GrayImage>;
}

/// Renders folio payloads to Code-128 rasters sized for a fixed slot.
#[derive(Debug, Clone)]
pub struct BarcodeStampGenerator {
    /// Output width in pixels.
    width_px: u32,
    /// Output height in pixels.
    height_px: u32,
}

impl BarcodeStampGenerator {
    /// Generator for a slot of `width_pt` x `height_pt` points rendered at
    /// `dpi` dots per inch.
    pub fn for_slot(width_pt: f32, height_pt: f32, dpi: f32) -> Self {
        let to_px = |pt: f32| ((pt / 72.0) * dpi).round().max(1.0) as u32;
        Self {
            width_px: to_px(width_pt),
            height_px: to_px(height_pt),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    /// Render `text`, trying the vector tier then the bitmap tier.
    #[instrument(skip(self))]
    pub fn generate(&self, text: &str) -> Option<GrayImage> {
        let encoded = match encode(text) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(%err, "Barcode payload cannot be encoded; no barcode stamp");
                return None;
            }
        };

        match self.render_vector(&encoded) {
            Ok(image) => return Some(image),
            Err(err) => warn!(%err, "Vector barcode failed, falling back to bitmap"),
        }

        match self.render_bitmap(&encoded) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(%err, "Bitmap barcode failed; no barcode stamp");
                None
            }
        }
    }

    /// Tier 1: SVG from the encoder, rasterised by resvg.
    pub(crate) fn render_vector(&self, encoded: &[u8]) -> Result<GrayImage> {
        let svg = SVG::new(SOURCE_BAR_HEIGHT)
            .generate(encoded)
            .map_err(|err| stamp_error("SVG barcode generation", err))?;
        let svg = with_svg_namespace(svg);

        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default())
            .map_err(|err| stamp_error("SVG barcode parsing", err))?;
        let size = tree.size();

        let mut pixmap = tiny_skia::Pixmap::new(self.width_px, self.height_px).ok_or_else(|| {
            EnmarcaError::StampGeneration(format!(
                "cannot allocate {}x{} barcode pixmap",
                self.width_px, self.height_px
            ))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let transform = tiny_skia::Transform::from_scale(
            self.width_px as f32 / size.width(),
            self.height_px as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // The pixmap is opaque after the white fill, so premultiplied and
        // straight RGBA coincide.
        let rgba = RgbaImage::from_raw(self.width_px, self.height_px, pixmap.take())
            .ok_or_else(|| EnmarcaError::StampGeneration("barcode pixmap size mismatch".into()))?;

        debug!(width = self.width_px, height = self.height_px, "Vector barcode rasterised");
        Ok(ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(rgba)).into_gray_on_white())
    }

    /// Tier 2: PNG from the bitmap encoder, resampled to the slot.
    pub(crate) fn render_bitmap(&self, encoded: &[u8]) -> Result<GrayImage> {
        let png = BitmapGenerator::png(SOURCE_BAR_HEIGHT)
            .generate(encoded)
            .map_err(|err| stamp_error("bitmap barcode generation", err))?;

        let image = ImageProcessor::from_bytes(&png)?
            .resize_exact(self.width_px, self.height_px)
            .into_gray_on_white();

        debug!(width = self.width_px, height = self.height_px, "Bitmap barcode resampled");
        Ok(image)
    }
}

impl BarcodeRenderer for BarcodeStampGenerator {
    fn render(&self, payload: &str) -> Option<GrayImage> {
        self.generate(payload)
    }
}

/// Encode `text` as Code-128 set B modules.
fn encode(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Err(EnmarcaError::StampGeneration("empty barcode payload".into()));
    }
    let symbol = Code128::new(format!("{CODE_SET_B}{text}"))
        .map_err(|err| stamp_error("Code-128 encoding", err))?;
    Ok(symbol.encode())
}

/// The encoder emits a bare `<svg>` root; usvg only accepts it in the SVG
/// namespace.
fn with_svg_namespace(svg: String) -> String {
    if svg.contains("xmlns=") {
        return svg;
    }
    svg.replacen("<svg", &format!("<svg xmlns=\"{SVG_NAMESPACE}\""), 1)
}

fn stamp_error(stage: &str, err: impl std::fmt::Display) -> EnmarcaError {
    EnmarcaError::StampGeneration(format!("{stage} failed: {err}"))
}
