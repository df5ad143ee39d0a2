// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open uploaded documents, templates and rear frames with
// `lopdf`, resolve page geometry, and import pages into another document as
// Form XObjects so they can be drawn as layers.

use std::collections::BTreeMap;
use std::path::Path;

use enmarca_core::error::{EnmarcaError, Result};
use enmarca_core::types::PageSize;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

/// Maximum depth followed when walking `/Parent` for inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Where a page sits on its sheet, as declared by the source document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `/MediaBox` as `[llx, lly, urx, ury]`, normalised so `ll < ur`.
    pub media_box: [f32; 4],
    /// `/Rotate`, one of 0, 90, 180, 270.
    pub rotation: u16,
}

impl PageGeometry {
    fn box_width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    fn box_height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Size of the page as a viewer displays it, rotation applied.
    pub fn displayed_size(&self) -> PageSize {
        match self.rotation {
            90 | 270 => PageSize::new(self.box_height(), self.box_width()),
            _ => PageSize::new(self.box_width(), self.box_height()),
        }
    }

    /// Form matrix mapping the media box onto `[0, 0, w, h]` of the upright
    /// displayed page.
    fn form_matrix(&self) -> [f32; 6] {
        let [llx, lly, urx, ury] = self.media_box;
        match self.rotation {
            90 => [0.0, -1.0, 1.0, 0.0, -lly, urx],
            180 => [-1.0, 0.0, 0.0, -1.0, urx, ury],
            270 => [0.0, 1.0, -1.0, 0.0, ury, -llx],
            _ => [1.0, 0.0, 0.0, 1.0, -llx, -lly],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SourcePage {
    id: ObjectId,
    geometry: PageGeometry,
}

/// A page of a [`SourceDocument`] copied into another document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedPage {
    /// Form XObject in the target document.
    pub form: ObjectId,
    /// Upright size of the imported page.
    pub size: PageSize,
}

/// A parsed, read-only PDF whose pages can be drawn into a composition.
///
/// Nothing in this type mutates the wrapped document, so one instance can be
/// shared between concurrent compositions.
pub struct SourceDocument {
    document: Document,
    pages: Vec<SourcePage>,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl SourceDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a frame resource from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening frame PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            EnmarcaError::FrameResource(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        let pages = index_pages(&document).map_err(|detail| {
            EnmarcaError::FrameResource(format!("{}: {}", path_ref.display(), detail))
        })?;

        debug!(pages = pages.len(), "Frame PDF loaded");

        Ok(Self {
            document,
            pages,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Parse an uploaded document already in memory.
    ///
    /// Fails with [`EnmarcaError::InvalidInputDocument`] when the bytes are
    /// not a PDF, the PDF has no pages, or a page has no usable media box.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            EnmarcaError::InvalidInputDocument(format!("failed to parse PDF: {}", err))
        })?;
        let pages = index_pages(&document).map_err(EnmarcaError::InvalidInputDocument)?;

        debug!(pages = pages.len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            pages,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Upright size of every page, in document order. Yields exactly
    /// [`page_count`](Self::page_count) items.
    pub fn page_sizes(&self) -> impl ExactSizeIterator<Item = PageSize> + '_ {
        self.pages.iter().map(|page| page.geometry.displayed_size())
    }

    /// Return the source path if the document was created via [`SourceDocument::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    // -- Import ---------------------------------------------------------------

    /// Copy the page at `index` into `target` as a Form XObject.
    ///
    /// The page's content streams are concatenated into the form and its
    /// (possibly inherited) resources are deep-cloned alongside it. The form
    /// matrix undoes `/Rotate`, so the form always draws upright in
    /// `[0, 0, size.width, size.height]`.
    pub fn import_page(&self, index: usize, target: &mut Document) -> Result<ImportedPage> {
        let page = self.pages.get(index).ok_or_else(|| {
            EnmarcaError::PageImport(format!(
                "page {} out of range (document has {} pages)",
                index,
                self.pages.len()
            ))
        })?;

        let content = self.document.get_page_content(page.id).map_err(|err| {
            EnmarcaError::PageImport(format!("cannot read content of page {}: {}", index, err))
        })?;

        let mut cloned = BTreeMap::new();
        let resources = match inherited(&self.document, page.id, b"Resources") {
            Some(resources) => deep_clone_object(&self.document, target, resources, &mut cloned),
            None => Object::Dictionary(Dictionary::new()),
        };

        let media_box: Vec<Object> = page.geometry.media_box.into_iter().map(Object::Real).collect();
        let matrix: Vec<Object> = page.geometry.form_matrix().into_iter().map(Object::Real).collect();
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "FormType" => Object::Integer(1),
                "BBox" => media_box,
                "Matrix" => matrix,
                "Resources" => resources,
            },
            content,
        );
        let form_id = target.add_object(form);

        debug!(index, objects_cloned = cloned.len(), "Page imported as form");

        Ok(ImportedPage {
            form: form_id,
            size: page.geometry.displayed_size(),
        })
    }
}

/// List every page in document order with its resolved geometry.
fn index_pages(document: &Document) -> std::result::Result<Vec<SourcePage>, String> {
    let page_ids = document.get_pages();
    if page_ids.is_empty() {
        return Err("the PDF has no pages".into());
    }

    // `get_pages` is keyed by 1-indexed page number, so iteration is in order.
    page_ids
        .into_iter()
        .map(|(number, id)| {
            page_geometry(document, id)
                .map(|geometry| SourcePage { id, geometry })
                .ok_or_else(|| format!("page {} has no usable media box", number))
        })
        .collect()
}

fn page_geometry(document: &Document, page_id: ObjectId) -> Option<PageGeometry> {
    let media_box = inherited(document, page_id, b"MediaBox")
        .and_then(|obj| resolve(document, obj).as_array().ok())
        .and_then(|values| parse_rect(document, values))?;

    let rotation = inherited(document, page_id, b"Rotate")
        .and_then(|obj| resolve(document, obj).as_i64().ok())
        .map(|degrees| degrees.rem_euclid(360))
        .unwrap_or(0);
    let rotation = match rotation {
        90 => 90,
        180 => 180,
        270 => 270,
        0 => 0,
        other => {
            warn!(?page_id, other, "Ignoring /Rotate that is not a multiple of 90");
            0
        }
    };

    Some(PageGeometry {
        media_box,
        rotation,
    })
}

fn parse_rect(document: &Document, values: &[Object]) -> Option<[f32; 4]> {
    if values.len() != 4 {
        return None;
    }
    let mut numbers = [0.0f32; 4];
    for (slot, value) in numbers.iter_mut().zip(values) {
        *slot = number(resolve(document, value))?;
    }
    let [x0, y0, x1, y1] = numbers;
    let rect = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
    (rect[2] - rect[0] > 0.0 && rect[3] - rect[1] > 0.0).then_some(rect)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Follow a reference once; anything else is returned as-is.
fn resolve<'a>(document: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => document.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Look `key` up on the page, then on its ancestors in the page tree.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = document.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Deep-clone a lopdf Object from `source` into `target`, following
/// references. `/Parent` keys are dropped so page-tree back-links are never
/// pulled in; `cloned` maps already-copied source ids to their target ids,
/// which keeps shared objects shared and terminates on cycles.
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
    cloned: &mut BTreeMap<ObjectId, ObjectId>,
) -> Object {
    match object {
        Object::Dictionary(dict) => Object::Dictionary(clone_dictionary(source, target, dict, cloned)),
        Object::Array(arr) => Object::Array(
            arr.iter()
                .map(|item| deep_clone_object(source, target, item, cloned))
                .collect(),
        ),
        Object::Reference(ref_id) => {
            if let Some(existing) = cloned.get(ref_id) {
                return Object::Reference(*existing);
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    // Reserve the id before recursing so cycles resolve to it.
                    let new_id = target.new_object_id();
                    cloned.insert(*ref_id, new_id);
                    let copy = deep_clone_object(source, target, referenced, cloned);
                    target.objects.insert(new_id, copy);
                    Object::Reference(new_id)
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Object::Null
                }
            }
        }
        Object::Stream(stream) => {
            let dict = clone_dictionary(source, target, &stream.dict, cloned);
            Object::Stream(Stream::new(dict, stream.content.clone()))
        }
        // Boolean, Integer, Real, String, Name and Null copy as-is.
        other => other.clone(),
    }
}

fn clone_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    cloned: &mut BTreeMap<ObjectId, ObjectId>,
) -> Dictionary {
    let mut copy = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        copy.set(key.clone(), deep_clone_object(source, target, value, cloned));
    }
    copy
}
