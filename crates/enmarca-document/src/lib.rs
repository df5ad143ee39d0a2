// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// enmarca-document — Document composition for the Enmarca framing pipeline.
//
// Provides PDF operations (parse uploads, import pages as forms, compose and
// serialise framed output), stamp rendering (QR and Code-128 rasters), rear
// frame resolution by region code, and folio allocation.

pub mod folio;
pub mod image;
pub mod pdf;
pub mod resources;
pub mod stamp;

#[cfg(test)]
mod test_support;

// Re-export the primary structs so callers can use `enmarca_document::PdfCompositor` etc.
pub use folio::{FolioAllocator, FolioSource};
pub use crate::image::processor::ImageProcessor;
pub use pdf::compositor::{PdfCompositor, StampLayout};
pub use pdf::reader::SourceDocument;
pub use pdf::writer::{ComposedDocument, LayerSource, StampKind};
pub use resources::{FrameCache, StateFrameResolver};
pub use stamp::{BarcodeRenderer, BarcodeStampGenerator, QrStampGenerator};
