// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — the composed output document.
//
// Pages are recorded as ordered layer lists while the compositor runs;
// imported pages and stamp rasters are added to the underlying `lopdf`
// document as XObjects straight away. Content streams, the page tree and
// the catalog are only written by `into_bytes`, so a composition that is
// dropped early leaves nothing behind.

use enmarca_core::error::{EnmarcaError, Result};
use enmarca_core::types::{Folio, PageSize, Rect};
use image::GrayImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

use super::reader::SourceDocument;

/// Resource name of the single text font.
const FONT_NAME: &str = "F1";

/// Where a page layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSource {
    /// The background template of the front pass.
    Template,
    /// A page of the uploaded document.
    Upload,
    /// A page of the regional rear frame.
    RearFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampKind {
    Qr,
    Barcode,
}

/// One drawing operation on a composed page, bottom layer first.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// A whole source page drawn as a Form XObject.
    Page {
        source: LayerSource,
        placement: Rect,
        content_size: PageSize,
        form: ObjectId,
    },
    /// A raster stamp.
    Stamp {
        kind: StampKind,
        placement: Rect,
        image: ObjectId,
    },
    /// A line of Times-Bold text with its baseline origin.
    Text {
        text: String,
        font_size: f32,
        x: f32,
        baseline: f32,
    },
}

/// A page of the output with its drawn layers.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    size: PageSize,
    layers: Vec<Layer>,
}

impl ComposedPage {
    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Placements of every stamp of `kind` on this page.
    pub fn stamps(&self, kind: StampKind) -> Vec<Rect> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Stamp {
                    kind: k, placement, ..
                } if *k == kind => Some(*placement),
                _ => None,
            })
            .collect()
    }

    /// Text of every text layer on this page, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Sources of every page layer on this page, bottom first.
    pub fn page_sources(&self) -> Vec<LayerSource> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Page { source, .. } => Some(*source),
                _ => None,
            })
            .collect()
    }
}

/// A raster stamp already embedded as an image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedStamp {
    id: ObjectId,
    width: u32,
    height: u32,
}

/// The output document under construction.
pub struct ComposedDocument {
    target: Document,
    pages: Vec<ComposedPage>,
    font: Option<ObjectId>,
    folio: Option<Folio>,
}

impl Default for ComposedDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposedDocument {
    pub fn new() -> Self {
        Self {
            target: Document::with_version("1.5"),
            pages: Vec::new(),
            font: None,
            folio: None,
        }
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&ComposedPage> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[ComposedPage] {
        &self.pages
    }

    /// Folio printed by the folio pass, if it ran.
    pub fn folio(&self) -> Option<Folio> {
        self.folio
    }

    pub(crate) fn set_folio(&mut self, folio: Folio) {
        self.folio = Some(folio);
    }

    // -- Building -------------------------------------------------------------

    /// Append an empty page of `size` and return its index.
    pub fn push_page(&mut self, size: PageSize) -> usize {
        self.pages.push(ComposedPage {
            size,
            layers: Vec::new(),
        });
        self.pages.len() - 1
    }

    /// Draw page `source_index` of `source` over the whole of page `index`,
    /// scaled to fit with its aspect ratio kept and centered.
    pub fn overlay_page(
        &mut self,
        index: usize,
        source: LayerSource,
        document: &SourceDocument,
        source_index: usize,
    ) -> Result<()> {
        let page_size = self
            .pages
            .get(index)
            .map(ComposedPage::size)
            .ok_or_else(|| missing_page(index, EnmarcaError::PageImport))?;

        let imported = document.import_page(source_index, &mut self.target)?;
        let placement = page_size
            .rect()
            .fit(imported.size.width, imported.size.height);

        self.pages[index].layers.push(Layer::Page {
            source,
            placement,
            content_size: imported.size,
            form: imported.form,
        });
        Ok(())
    }

    /// Embed a grayscale raster once so it can be placed any number of times.
    pub fn embed_stamp(&mut self, image: &GrayImage) -> EmbeddedStamp {
        let (width, height) = image.dimensions();
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(width as i64),
                "Height" => Object::Integer(height as i64),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
            },
            image.as_raw().clone(),
        );
        let id = self.target.add_object(stream);
        EmbeddedStamp { id, width, height }
    }

    /// Place `stamp` inside `slot` on page `index`, keeping its aspect
    /// ratio. Returns the rectangle actually covered.
    pub fn place_stamp(
        &mut self,
        index: usize,
        kind: StampKind,
        stamp: &EmbeddedStamp,
        slot: Rect,
    ) -> Result<Rect> {
        let page = self
            .pages
            .get_mut(index)
            .ok_or_else(|| missing_page(index, EnmarcaError::StampGeneration))?;
        let placement = slot.fit(stamp.width as f32, stamp.height as f32);
        page.layers.push(Layer::Stamp {
            kind,
            placement,
            image: stamp.id,
        });
        Ok(placement)
    }

    /// Write `text` in Times-Bold with its baseline starting at `(x, baseline)`.
    pub fn draw_text(
        &mut self,
        index: usize,
        x: f32,
        baseline: f32,
        text: &str,
        font_size: f32,
    ) -> Result<()> {
        if index >= self.pages.len() {
            return Err(missing_page(index, EnmarcaError::StampGeneration));
        }
        if self.font.is_none() {
            self.font = Some(self.target.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Times-Bold",
                "Encoding" => "WinAnsiEncoding",
            }));
        }
        self.pages[index].layers.push(Layer::Text {
            text: text.to_owned(),
            font_size,
            x,
            baseline,
        });
        Ok(())
    }

    // -- Output ---------------------------------------------------------------

    /// Write content streams, the page tree and the catalog, then serialise.
    #[instrument(skip_all, fields(pages = self.pages.len()))]
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let Self {
            mut target,
            pages,
            font,
            ..
        } = self;

        let pages_id = target.new_object_id();
        let mut kids = Vec::with_capacity(pages.len());

        for page in &pages {
            let (operations, xobjects) = page_operations(page);
            let content = Content { operations }.encode().map_err(|err| {
                EnmarcaError::Serialization(format!("content stream encoding failed: {}", err))
            })?;
            let content_id = target.add_object(Stream::new(Dictionary::new(), content));

            let mut resources = dictionary! { "XObject" => xobjects };
            if let Some(font_id) = font {
                resources.set("Font", dictionary! { FONT_NAME => font_id });
            }

            let page_id = target.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.size.width),
                    Object::Real(page.size.height),
                ],
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        target.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => Object::Integer(kids.len() as i64),
                "Kids" => kids,
            }),
        );
        let catalog_id = target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        target.trailer.set("Root", catalog_id);
        target.compress();

        let mut output = Vec::new();
        target.save_to(&mut output).map_err(|err| {
            EnmarcaError::Serialization(format!("failed to write PDF: {}", err))
        })?;

        debug!(output_bytes = output.len(), "Composed document serialised");
        Ok(output)
    }
}

/// Content operations for one page plus the XObject resources they name.
fn page_operations(page: &ComposedPage) -> (Vec<Operation>, Dictionary) {
    let height = page.size.height;
    let mut operations = Vec::new();
    let mut xobjects = Dictionary::new();

    for (n, layer) in page.layers.iter().enumerate() {
        match layer {
            Layer::Page {
                placement,
                content_size,
                form,
                ..
            } => {
                let name = format!("Fx{n}");
                xobjects.set(name.clone(), Object::Reference(*form));
                let sx = placement.width() / content_size.width;
                let sy = placement.height() / content_size.height;
                draw_xobject(&mut operations, &name, [sx, sy], placement, height);
            }
            Layer::Stamp {
                placement, image, ..
            } => {
                let name = format!("Im{n}");
                xobjects.set(name.clone(), Object::Reference(*image));
                // Image space is the unit square.
                let scale = [placement.width(), placement.height()];
                draw_xobject(&mut operations, &name, scale, placement, height);
            }
            Layer::Text {
                text,
                font_size,
                x,
                baseline,
            } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(FONT_NAME.into()), Object::Real(*font_size)],
                ));
                operations.push(Operation::new("g", vec![Object::Integer(0)]));
                operations.push(Operation::new(
                    "Td",
                    vec![Object::Real(*x), Object::Real(height - baseline)],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
                operations.push(Operation::new("ET", vec![]));
            }
        }
    }

    (operations, xobjects)
}

/// `q sx 0 0 sy x y cm /name Do Q`, converting the top-left placement to
/// PDF's bottom-left user space.
fn draw_xobject(
    operations: &mut Vec<Operation>,
    name: &str,
    [sx, sy]: [f32; 2],
    placement: &Rect,
    page_height: f32,
) {
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        vec![
            Object::Real(sx),
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(sy),
            Object::Real(placement.x0),
            Object::Real(page_height - placement.y1),
        ],
    ));
    operations.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
    operations.push(Operation::new("Q", vec![]));
}

fn missing_page(index: usize, kind: fn(String) -> EnmarcaError) -> EnmarcaError {
    kind(format!("composed page {} does not exist", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pdf_bytes;

    fn reload(bytes: &[u8]) -> Document {
        Document::load_mem(bytes).unwrap()
    }

    #[test]
    fn pages_keep_their_sizes() {
        let mut composed = ComposedDocument::new();
        composed.push_page(PageSize::new(612.0, 792.0));
        composed.push_page(PageSize::new(300.0, 200.0));

        let doc = reload(&composed.into_bytes().unwrap());
        let sizes: Vec<PageSize> = doc
            .get_pages()
            .values()
            .map(|id| {
                let media_box = doc.get_dictionary(*id).unwrap().get(b"MediaBox").unwrap();
                let values = media_box.as_array().unwrap();
                PageSize::new(
                    values[2].as_float().unwrap(),
                    values[3].as_float().unwrap(),
                )
            })
            .collect();
        assert_eq!(sizes, vec![PageSize::new(612.0, 792.0), PageSize::new(300.0, 200.0)]);
    }

    #[test]
    fn overlay_fits_and_centers_source_page() {
        let source = SourceDocument::from_bytes(&pdf_bytes(&[(300.0, 300.0)])).unwrap();
        let mut composed = ComposedDocument::new();
        let page = composed.push_page(PageSize::new(600.0, 800.0));
        composed
            .overlay_page(page, LayerSource::Upload, &source, 0)
            .unwrap();

        match &composed.page(page).unwrap().layers()[0] {
            Layer::Page { placement, .. } => {
                assert_eq!(*placement, Rect::new(0.0, 100.0, 600.0, 700.0));
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn stamp_embedded_once_placed_twice() {
        let mut composed = ComposedDocument::new();
        composed.push_page(PageSize::new(612.0, 792.0));
        let stamp = composed.embed_stamp(&GrayImage::new(10, 10));
        let a = composed
            .place_stamp(0, StampKind::Qr, &stamp, Rect::new(0.0, 0.0, 20.0, 40.0))
            .unwrap();
        let b = composed
            .place_stamp(0, StampKind::Qr, &stamp, Rect::new(100.0, 100.0, 140.0, 140.0))
            .unwrap();
        assert_eq!(a, Rect::new(0.0, 10.0, 20.0, 30.0));
        assert_eq!(b, Rect::new(100.0, 100.0, 140.0, 140.0));
        assert_eq!(composed.page(0).unwrap().stamps(StampKind::Qr).len(), 2);
    }

    #[test]
    fn text_lands_in_content_stream() {
        let mut composed = ComposedDocument::new();
        composed.push_page(PageSize::new(612.0, 792.0));
        composed.draw_text(0, 68.0, 45.0, "FOLIO", 14.0).unwrap();

        let doc = reload(&composed.into_bytes().unwrap());
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("(FOLIO)"), "{content}");
        assert!(content.contains("/F1"));
    }

    #[test]
    fn drawing_on_missing_page_is_an_error() {
        let mut composed = ComposedDocument::new();
        let stamp = composed.embed_stamp(&GrayImage::new(1, 1));
        assert!(composed.draw_text(0, 0.0, 0.0, "x", 10.0).is_err());
        assert!(
            composed
                .place_stamp(2, StampKind::Barcode, &stamp, Rect::new(0.0, 0.0, 1.0, 1.0))
                .is_err()
        );
    }
}
