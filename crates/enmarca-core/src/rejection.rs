// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing rejections.
//
// Every error that ends an invocation is mapped to a short reason and one of
// three categories. Reasons never carry filesystem paths or backtraces.

use crate::error::EnmarcaError;

/// Who is expected to act on a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    /// The request itself is wrong: missing file, unreadable PDF.
    BadInput,
    /// The service refused to do the work right now.
    Unavailable,
    /// Something broke on our side.
    Internal,
}

impl RejectionCategory {
    /// Status code a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadInput => 400,
            Self::Unavailable => 403,
            Self::Internal => 500,
        }
    }
}

/// A structured refusal returned instead of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub category: RejectionCategory,
    pub reason: String,
}

impl Rejection {
    fn new(category: RejectionCategory, reason: impl Into<String>) -> Self {
        Self {
            category,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Rejection {}

impl From<&EnmarcaError> for Rejection {
    fn from(err: &EnmarcaError) -> Self {
        reject(err)
    }
}

impl From<EnmarcaError> for Rejection {
    fn from(err: EnmarcaError) -> Self {
        reject(&err)
    }
}

/// Convert an `EnmarcaError` into the rejection shown to the caller.
pub fn reject(err: &EnmarcaError) -> Rejection {
    use RejectionCategory::*;

    match err {
        EnmarcaError::OutsideServiceWindow => {
            Rejection::new(Unavailable, "service unavailable outside working hours")
        }
        EnmarcaError::DeadlineExceeded { .. } => {
            Rejection::new(Unavailable, "the document could not be generated in time")
        }

        EnmarcaError::MissingUpload => Rejection::new(BadInput, "no file uploaded"),
        EnmarcaError::EmptyFilename => Rejection::new(BadInput, "no file selected"),

        // The detail comes from the PDF parser and describes the bytes the
        // caller sent, so it is safe to echo back.
        EnmarcaError::InvalidInputDocument(detail) => Rejection::new(
            BadInput,
            format!("the uploaded file is not a usable PDF: {detail}"),
        ),

        // Everything below is either non-fatal inside the pipeline or an
        // internal fault; the caller only learns that generation failed.
        EnmarcaError::Serialization(_)
        | EnmarcaError::UnresolvedRearResource(_)
        | EnmarcaError::FrameResource(_)
        | EnmarcaError::PageImport(_)
        | EnmarcaError::StampGeneration(_)
        | EnmarcaError::Config(_)
        | EnmarcaError::ConfigParse(_)
        | EnmarcaError::Io(_) => {
            Rejection::new(Internal, "internal error while generating the document")
        }
    }
}
