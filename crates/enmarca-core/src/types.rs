// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Enmarca framing pipeline.

use std::time::Instant;

use uuid::Uuid;

use crate::error::{EnmarcaError, Result};

/// Media type of every document the pipeline emits.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Series prefix shared by every folio.
pub const FOLIO_SERIES: &str = "A30";

/// Smallest folio number that can be allocated.
pub const FOLIO_MIN: u32 = 100_000;

/// Largest folio number that can be allocated.
pub const FOLIO_MAX: u32 = 999_999;

/// Identifier attached to the tracing span of one service invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document as it arrived from the caller.
///
/// The filename doubles as the QR payload and carries the region code at
/// characters 11..13 of its base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Filename suggested for the composed output.
    pub fn output_filename(&self) -> String {
        format!("_{}", self.filename)
    }
}

/// Which optional passes the compositor runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOverlayOptions {
    /// Lay the uploaded pages over the background template.
    pub apply_front: bool,
    /// Append the regional rear frame selected by the filename.
    pub apply_rear: bool,
    /// Print a folio label and barcode on the first page.
    pub apply_folio: bool,
}

impl FrameOverlayOptions {
    pub fn all() -> Self {
        Self {
            apply_front: true,
            apply_rear: true,
            apply_folio: true,
        }
    }
}

/// A six-digit document number in the `A30` series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Folio(u32);

impl Folio {
    /// Wrap `number`, rejecting values outside [`FOLIO_MIN`]..=[`FOLIO_MAX`].
    pub fn new(number: u32) -> Option<Self> {
        (FOLIO_MIN..=FOLIO_MAX).contains(&number).then_some(Self(number))
    }

    /// Wrap `number`, pulling it into [`FOLIO_MIN`]..=[`FOLIO_MAX`].
    pub fn clamped(number: u32) -> Self {
        Self(number.clamp(FOLIO_MIN, FOLIO_MAX))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// Human-readable label, e.g. `A30-482913`.
    pub fn label(&self) -> String {
        format!("{FOLIO_SERIES}-{}", self.0)
    }

    /// Text encoded in the barcode, e.g. `A30482913`.
    pub fn barcode_payload(&self) -> String {
        format!("{FOLIO_SERIES}{}", self.0)
    }
}

impl std::fmt::Display for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The full-page rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A rectangle in page space with a top-left origin, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Largest rectangle with the aspect ratio `content_w : content_h` that
    /// fits inside `self`, centered on both axes.
    pub fn fit(&self, content_w: f32, content_h: f32) -> Rect {
        if content_w <= 0.0 || content_h <= 0.0 {
            return *self;
        }
        let scale = (self.width() / content_w).min(self.height() / content_h);
        let w = content_w * scale;
        let h = content_h * scale;
        let x0 = self.x0 + (self.width() - w) / 2.0;
        let y0 = self.y0 + (self.height() - h) / 2.0;
        Rect::new(x0, y0, x0 + w, y0 + h)
    }

    /// Whether the interiors of the two rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Whether `other` lies entirely within `self` (with a small tolerance).
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 1e-3;
        other.x0 >= self.x0 - EPS
            && other.y0 >= self.y0 - EPS
            && other.x1 <= self.x1 + EPS
            && other.y1 <= self.y1 + EPS
    }
}

/// Optional point in time after which an invocation must stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with [`EnmarcaError::DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_expired() {
            return Err(EnmarcaError::DeadlineExceeded { stage });
        }
        Ok(())
    }
}

/// The successful result of one service invocation.
#[derive(Debug, Clone)]
pub struct ComposedOutput {
    /// Serialised PDF.
    pub bytes: Vec<u8>,
    /// Suggested download name, `_<original filename>`.
    pub filename: String,
    pub media_type: &'static str,
    /// Folio printed on the first page, when the folio pass ran.
    pub folio: Option<Folio>,
}
