// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compositor — assembles the framed output document.
//
// Passes run in a fixed order: parse, front (or 1:1 copy), rear, QR, folio.
// Only the parse step can fail the composition; each later pass skips its
// own contribution and logs a warning when something it needs is missing.

use std::path::PathBuf;
use std::sync::Arc;

use enmarca_core::config::OverlayConfig;
use enmarca_core::error::Result;
use enmarca_core::types::{Deadline, FrameOverlayOptions, Rect, UploadedDocument};
use tracing::{debug, info, instrument, warn};

use super::reader::SourceDocument;
use super::writer::{ComposedDocument, LayerSource, StampKind};
use crate::folio::{FolioAllocator, FolioSource};
use crate::resources::{FrameCache, StateFrameResolver, base_name};
use crate::stamp::{BarcodeRenderer, BarcodeStampGenerator, QrStampGenerator};

/// Points per millimetre.
const PT_PER_MM: f32 = 2.83465;

/// Baseline origin and size of one line of stamp text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub x: f32,
    pub baseline: f32,
    pub font_size: f32,
}

/// Fixed stamp geometry, in points from the top-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampLayout {
    /// Upper QR slot on the second page.
    pub qr_top: Rect,
    /// Side of the lower QR slot.
    pub qr_bottom_side: f32,
    /// Left edge of the lower QR slot.
    pub qr_bottom_left: f32,
    /// Distance from the lower QR slot to the bottom of the page.
    pub qr_bottom_margin: f32,
    /// The `FOLIO` heading.
    pub folio_heading: TextPlacement,
    /// The `A30-NNNNNN` label.
    pub folio_label: TextPlacement,
    pub barcode: Rect,
}

impl Default for StampLayout {
    fn default() -> Self {
        Self {
            qr_top: Rect::new(34.0, 24.0, 95.0, 88.0),
            qr_bottom_side: 17.0 * PT_PER_MM,
            qr_bottom_left: 20.0 + 4.26 * PT_PER_MM,
            qr_bottom_margin: 10.0 + 5.33 * PT_PER_MM,
            folio_heading: TextPlacement {
                x: 68.0,
                baseline: 45.0,
                font_size: 14.0,
            },
            folio_label: TextPlacement {
                x: 55.0,
                baseline: 65.0,
                font_size: 12.0,
            },
            barcode: Rect::new(55.0, 75.0, 200.0, 125.0),
        }
    }
}

impl StampLayout {
    /// Lower-left QR slot on a page `page_height` points tall.
    pub fn qr_bottom(&self, page_height: f32) -> Rect {
        let y1 = page_height - self.qr_bottom_margin;
        Rect::new(
            self.qr_bottom_left,
            y1 - self.qr_bottom_side,
            self.qr_bottom_left + self.qr_bottom_side,
            y1,
        )
    }
}

/// Builds framed documents from uploads.
///
/// One compositor serves many compositions; the template and rear frames
/// are parsed on first use and shared read-only afterwards.
pub struct PdfCompositor {
    template_path: PathBuf,
    resolver: StateFrameResolver,
    cache: FrameCache,
    qr: QrStampGenerator,
    barcode: Arc<dyn BarcodeRenderer>,
    barcode_dpi: f32,
    folios: Arc<dyn FolioSource>,
    layout: StampLayout,
}

impl PdfCompositor {
    /// Default barcode rasterisation density.
    pub const DEFAULT_BARCODE_DPI: f32 = 300.0;

    pub fn new(template_path: impl Into<PathBuf>, resolver: StateFrameResolver) -> Self {
        let layout = StampLayout::default();
        Self {
            template_path: template_path.into(),
            resolver,
            cache: FrameCache::new(),
            qr: QrStampGenerator::default(),
            barcode: barcode_for(&layout, Self::DEFAULT_BARCODE_DPI),
            barcode_dpi: Self::DEFAULT_BARCODE_DPI,
            folios: Arc::new(FolioAllocator::new()),
            layout,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        let mut compositor = Self::new(
            &config.background_template,
            StateFrameResolver::from_config(config),
        );
        compositor.barcode_dpi = config.barcode_dpi;
        compositor.barcode = barcode_for(&compositor.layout, config.barcode_dpi);
        compositor
    }

    pub fn with_folio_source(mut self, folios: Arc<dyn FolioSource>) -> Self {
        self.folios = folios;
        self
    }

    /// Replace the stamp geometry. The barcode renderer is reset to the
    /// built-in generator sized for the new slot.
    pub fn with_layout(mut self, layout: StampLayout) -> Self {
        self.barcode = barcode_for(&layout, self.barcode_dpi);
        self.layout = layout;
        self
    }

    pub fn with_barcode_renderer(mut self, barcode: Arc<dyn BarcodeRenderer>) -> Self {
        self.barcode = barcode;
        self
    }

    pub fn layout(&self) -> &StampLayout {
        &self.layout
    }

    /// Compose `upload` with no deadline.
    pub fn compose(
        &self,
        upload: &UploadedDocument,
        options: FrameOverlayOptions,
    ) -> Result<ComposedDocument> {
        self.compose_until(upload, options, Deadline::none())
    }

    /// Compose `upload`, giving up with `DeadlineExceeded` between passes
    /// once `deadline` has passed.
    #[instrument(skip_all, fields(
        filename = %upload.filename,
        front = options.apply_front,
        rear = options.apply_rear,
        folio = options.apply_folio
    ))]
    pub fn compose_until(
        &self,
        upload: &UploadedDocument,
        options: FrameOverlayOptions,
        deadline: Deadline,
    ) -> Result<ComposedDocument> {
        let source = SourceDocument::from_bytes(&upload.bytes)?;
        info!(pages = source.page_count(), "Composing document");
        deadline.check("parse")?;

        let mut composed = ComposedDocument::new();

        let framed = options.apply_front && self.front_pass(&mut composed, &source);
        if !framed {
            copy_pages(&mut composed, &source);
        }
        deadline.check("front pass")?;

        if options.apply_rear {
            self.rear_pass(&mut composed, &upload.filename);
        }
        deadline.check("rear pass")?;

        if composed.page_count() >= 2 {
            self.qr_pass(&mut composed, base_name(&upload.filename));
        }
        deadline.check("qr pass")?;

        if options.apply_folio {
            self.folio_pass(&mut composed);
        }
        deadline.check("folio pass")?;

        info!(
            pages = composed.page_count(),
            folio = ?composed.folio(),
            "Composition complete"
        );
        Ok(composed)
    }

    /// Lay the upload over the background template. Returns `false` when the
    /// template is unavailable, leaving `composed` untouched.
    fn front_pass(&self, composed: &mut ComposedDocument, upload: &SourceDocument) -> bool {
        let template = match self.cache.get_or_load(&self.template_path) {
            Ok(template) => template,
            Err(err) => {
                warn!(%err, "Background template unavailable; copying pages 1:1");
                return false;
            }
        };

        for (index, size) in template.page_sizes().enumerate() {
            let page = composed.push_page(size);
            if let Err(err) = composed.overlay_page(page, LayerSource::Template, &template, index) {
                warn!(%err, page, "Template page not drawn");
            }
            if index < upload.page_count()
                && let Err(err) = composed.overlay_page(page, LayerSource::Upload, upload, index)
            {
                warn!(%err, page, "Uploaded page not drawn over template");
            }
        }
        debug!(
            template = template.source_path().unwrap_or_default(),
            template_pages = template.page_count(),
            "Front pass done"
        );
        true
    }

    fn rear_pass(&self, composed: &mut ComposedDocument, filename: &str) {
        let Some(path) = self.resolver.resolve(filename) else {
            return;
        };
        let frame = match self.cache.get_or_load(&path) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "Rear frame unavailable; skipping rear pass");
                return;
            }
        };

        for (index, size) in frame.page_sizes().enumerate() {
            let page = composed.push_page(size);
            if let Err(err) = composed.overlay_page(page, LayerSource::RearFrame, &frame, index) {
                warn!(%err, page, "Rear frame page not drawn");
            }
        }
        debug!(path = %path.display(), rear_pages = frame.page_count(), "Rear pass done");
    }

    /// Draw the same QR twice on page index 1.
    fn qr_pass(&self, composed: &mut ComposedDocument, payload: &str) {
        let Some(height) = composed.page(1).map(|page| page.size().height) else {
            return;
        };
        let image = match self.qr.generate(payload) {
            Ok(image) => image,
            Err(err) => {
                warn!(%err, "QR stamp skipped");
                return;
            }
        };

        let stamp = composed.embed_stamp(&image);
        for slot in [self.layout.qr_top, self.layout.qr_bottom(height)] {
            if let Err(err) = composed.place_stamp(1, StampKind::Qr, &stamp, slot) {
                warn!(%err, "QR stamp not placed");
            }
        }
    }

    /// Print the folio heading, label and barcode on page index 0.
    fn folio_pass(&self, composed: &mut ComposedDocument) {
        if composed.page_count() == 0 {
            return;
        }
        let folio = self.folios.allocate();
        composed.set_folio(folio);

        let heading = self.layout.folio_heading;
        let label = self.layout.folio_label;
        for (placement, text) in [(heading, "FOLIO".to_owned()), (label, folio.label())] {
            if let Err(err) =
                composed.draw_text(0, placement.x, placement.baseline, &text, placement.font_size)
            {
                warn!(%err, "Folio text not drawn");
            }
        }

        match self.barcode.render(&folio.barcode_payload()) {
            Some(image) => {
                let stamp = composed.embed_stamp(&image);
                if let Err(err) =
                    composed.place_stamp(0, StampKind::Barcode, &stamp, self.layout.barcode)
                {
                    warn!(%err, "Barcode stamp not placed");
                }
            }
            None => warn!(folio = %folio, "Folio printed without barcode"),
        }
    }
}

/// Copy every uploaded page at its own size.
fn copy_pages(composed: &mut ComposedDocument, upload: &SourceDocument) {
    for (index, size) in upload.page_sizes().enumerate() {
        let page = composed.push_page(size);
        if let Err(err) = composed.overlay_page(page, LayerSource::Upload, upload, index) {
            warn!(%err, page, "Uploaded page not copied");
        }
    }
}

fn barcode_for(layout: &StampLayout, dpi: f32) -> Arc<dyn BarcodeRenderer> {
    Arc::new(BarcodeStampGenerator::for_slot(
        layout.barcode.width(),
        layout.barcode.height(),
        dpi,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pdf_bytes, write_pdf};
    use enmarca_core::error::EnmarcaError;
    use enmarca_core::types::{FOLIO_MAX, FOLIO_MIN, Folio, PageSize};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const KNOWN: &str = "ACTA0000001JC.pdf";
    const UNKNOWN: &str = "ACTA0000001ZZ.pdf";

    const A4: (f32, f32) = (595.0, 842.0);
    const LETTER: (f32, f32) = (612.0, 792.0);

    struct Fixture {
        _dir: TempDir,
        compositor: PdfCompositor,
    }

    /// Two-page A4 template and a one-page Letter rear frame for `JC`.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.pdf");
        let frames = dir.path().join("frames");
        std::fs::create_dir(&frames).unwrap();
        write_pdf(&template, &[A4, A4]);
        write_pdf(&frames.join("JC.pdf"), &[LETTER]);

        let compositor = PdfCompositor::new(&template, StateFrameResolver::new(&frames, "pdf"));
        Fixture {
            _dir: dir,
            compositor,
        }
    }

    fn upload(filename: &str, sizes: &[(f32, f32)]) -> UploadedDocument {
        UploadedDocument::new(pdf_bytes(sizes), filename)
    }

    fn options(front: bool, rear: bool, folio: bool) -> FrameOverlayOptions {
        FrameOverlayOptions {
            apply_front: front,
            apply_rear: rear,
            apply_folio: folio,
        }
    }

    fn sizes(composed: &ComposedDocument) -> Vec<PageSize> {
        composed.pages().iter().map(|page| page.size()).collect()
    }

    struct FixedFolio(u32);

    impl FolioSource for FixedFolio {
        fn allocate(&self) -> Folio {
            Folio::clamped(self.0)
        }
    }

    /// A renderer whose both tiers have failed.
    struct NoBarcode;

    impl BarcodeRenderer for NoBarcode {
        fn render(&self, _payload: &str) -> Option<image::GrayImage> {
            None
        }
    }

    #[test]
    fn no_options_copies_pages_one_to_one() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[(300.0, 400.0)]), options(false, false, false))
            .unwrap();
        assert_eq!(sizes(&composed), vec![PageSize::new(300.0, 400.0)]);
        assert!(composed.page(0).unwrap().stamps(StampKind::Qr).is_empty());
        assert!(composed.folio().is_none());
    }

    #[test]
    fn front_pass_follows_template_pages() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[LETTER]), options(true, false, false))
            .unwrap();
        assert_eq!(sizes(&composed), vec![PageSize::new(A4.0, A4.1); 2]);
        assert_eq!(
            composed.page(0).unwrap().page_sources(),
            vec![LayerSource::Template, LayerSource::Upload]
        );
        assert_eq!(composed.page(1).unwrap().page_sources(), vec![LayerSource::Template]);
    }

    #[test]
    fn front_pass_drops_uploaded_pages_beyond_template() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[LETTER, LETTER, LETTER]), options(true, false, false))
            .unwrap();
        assert_eq!(composed.page_count(), 2);
    }

    #[test]
    fn missing_template_degrades_to_copy() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = PdfCompositor::new(
            dir.path().join("absent.pdf"),
            StateFrameResolver::new(dir.path(), "pdf"),
        );
        let composed = compositor
            .compose(&upload(KNOWN, &[LETTER]), options(true, false, false))
            .unwrap();
        assert_eq!(sizes(&composed), vec![PageSize::new(LETTER.0, LETTER.1)]);
    }

    #[test]
    fn rear_frame_appended_for_known_code() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[A4]), options(false, true, false))
            .unwrap();
        assert_eq!(
            sizes(&composed),
            vec![PageSize::new(A4.0, A4.1), PageSize::new(LETTER.0, LETTER.1)]
        );
        assert_eq!(
            composed.page(1).unwrap().page_sources(),
            vec![LayerSource::RearFrame]
        );
    }

    #[test]
    fn unknown_code_skips_rear_pass() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(UNKNOWN, &[A4]), options(false, true, false))
            .unwrap();
        assert_eq!(composed.page_count(), 1);
    }

    #[test]
    fn page_count_follows_options() {
        let f = fixture();
        let doc = upload(KNOWN, &[LETTER, LETTER, LETTER]);
        let cases = [
            (options(false, false, false), 3),
            (options(true, false, false), 2),
            (options(false, true, false), 4),
            (options(true, true, true), 3),
        ];
        for (opts, expected) in cases {
            let composed = f.compositor.compose(&doc, opts).unwrap();
            assert_eq!(composed.page_count(), expected, "{opts:?}");
        }
    }

    #[test]
    fn qr_pair_on_second_page_only() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[A4, A4]), options(false, false, false))
            .unwrap();

        assert!(composed.page(0).unwrap().stamps(StampKind::Qr).is_empty());
        let second = composed.page(1).unwrap();
        let qrs = second.stamps(StampKind::Qr);
        assert_eq!(qrs.len(), 2);
        assert!(!qrs[0].intersects(&qrs[1]));

        let page_rect = second.size().rect();
        let layout = f.compositor.layout();
        assert!(layout.qr_top.contains(&qrs[0]));
        assert!(layout.qr_bottom(A4.1).contains(&qrs[1]));
        assert!(qrs.iter().all(|qr| page_rect.contains(qr)));
    }

    #[test]
    fn single_page_output_has_no_qr() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(UNKNOWN, &[A4]), options(false, true, true))
            .unwrap();
        assert_eq!(composed.page_count(), 1);
        assert!(composed.page(0).unwrap().stamps(StampKind::Qr).is_empty());
    }

    #[test]
    fn folio_pass_prints_label_and_barcode_on_first_page() {
        let f = fixture();
        let compositor = f.compositor.with_folio_source(Arc::new(FixedFolio(482_913)));
        let composed = compositor
            .compose(&upload(KNOWN, &[A4, A4]), options(false, false, true))
            .unwrap();

        assert_eq!(composed.folio().map(|f| f.number()), Some(482_913));
        let first = composed.page(0).unwrap();
        assert_eq!(first.texts(), vec!["FOLIO", "A30-482913"]);

        let barcodes = first.stamps(StampKind::Barcode);
        assert_eq!(barcodes.len(), 1);
        assert!(compositor.layout().barcode.contains(&barcodes[0]));

        let second = composed.page(1).unwrap();
        assert!(second.texts().is_empty());
        assert!(second.stamps(StampKind::Barcode).is_empty());
    }

    #[test]
    fn random_folio_is_in_range() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[A4]), options(false, false, true))
            .unwrap();
        let number = composed.folio().unwrap().number();
        assert!((FOLIO_MIN..=FOLIO_MAX).contains(&number));
    }

    #[test]
    fn invalid_upload_is_fatal() {
        let f = fixture();
        let bad = UploadedDocument::new(b"not a pdf".to_vec(), KNOWN);
        let result = f.compositor.compose(&bad, FrameOverlayOptions::all());
        assert!(matches!(result, Err(EnmarcaError::InvalidInputDocument(_))));
    }

    #[test]
    fn expired_deadline_stops_composition() {
        let f = fixture();
        let deadline = Deadline::at(Instant::now() - Duration::from_millis(1));
        let result = f
            .compositor
            .compose_until(&upload(KNOWN, &[A4]), FrameOverlayOptions::all(), deadline);
        assert!(matches!(result, Err(EnmarcaError::DeadlineExceeded { .. })));
    }

    #[test]
    fn composed_output_serialises_and_reloads() {
        let f = fixture();
        let composed = f
            .compositor
            .compose(&upload(KNOWN, &[LETTER]), FrameOverlayOptions::all())
            .unwrap();
        let bytes = composed.into_bytes().unwrap();
        let reloaded = SourceDocument::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.page_count(), 3);
        assert_eq!(reloaded.page_sizes().nth(2), Some(PageSize::new(LETTER.0, LETTER.1)));
    }

    #[test]
    fn folio_without_barcode_still_prints_text() {
        let f = fixture();
        let compositor = f
            .compositor
            .with_folio_source(Arc::new(FixedFolio(731_004)))
            .with_barcode_renderer(Arc::new(NoBarcode));
        let composed = compositor
            .compose(&upload(KNOWN, &[A4]), options(false, false, true))
            .unwrap();

        let first = composed.page(0).unwrap();
        assert_eq!(first.texts(), vec!["FOLIO", "A30-731004"]);
        assert!(first.stamps(StampKind::Barcode).is_empty());
        assert_eq!(composed.folio().map(|f| f.number()), Some(731_004));
    }

    #[test]
    fn unencodable_qr_payload_skips_only_the_qr_pair() {
        let f = fixture();
        let filename = format!("ACTA0000001JC{}.pdf", "x".repeat(5_000));
        let composed = f
            .compositor
            .compose(&upload(&filename, &[A4, A4]), options(false, false, true))
            .unwrap();

        assert_eq!(composed.page_count(), 2);
        assert!(composed.page(1).unwrap().stamps(StampKind::Qr).is_empty());
        let first = composed.page(0).unwrap();
        assert_eq!(first.texts().len(), 2);
        assert_eq!(first.stamps(StampKind::Barcode).len(), 1);
    }

    #[test]
    fn custom_layout_moves_barcode_slot() {
        let f = fixture();
        let layout = StampLayout {
            barcode: Rect::new(300.0, 75.0, 445.0, 125.0),
            ..StampLayout::default()
        };
        let compositor = f.compositor.with_layout(layout);
        let composed = compositor
            .compose(&upload(KNOWN, &[A4]), options(false, false, true))
            .unwrap();

        let barcodes = composed.page(0).unwrap().stamps(StampKind::Barcode);
        assert_eq!(barcodes.len(), 1);
        assert!(layout.barcode.contains(&barcodes[0]));
    }

    #[test]
    fn bottom_qr_slot_tracks_page_height() {
        let layout = StampLayout::default();
        let slot = layout.qr_bottom(842.0);
        assert!((slot.width() - 48.189).abs() < 1e-2);
        assert!((slot.y1 - (842.0 - 10.0 - 15.109)).abs() < 1e-2);
        assert!(!slot.intersects(&layout.qr_top));
    }
}
