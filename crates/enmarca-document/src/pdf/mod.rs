// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading source pages, composing framed output, serialising.

pub mod compositor;
pub mod reader;
pub mod writer;

pub use compositor::{PdfCompositor, StampLayout, TextPlacement};
pub use reader::{ImportedPage, PageGeometry, SourceDocument};
pub use writer::{ComposedDocument, ComposedPage, EmbeddedStamp, Layer, LayerSource, StampKind};
