// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Enmarca.

use thiserror::Error;

/// Top-level error type for all Enmarca operations.
///
/// Variants are grouped by the stage that raises them. Whether a variant is
/// fatal depends on that stage: request and parse errors abort an invocation,
/// while frame, import and stamp errors only skip their own contribution.
#[derive(Debug, Error)]
pub enum EnmarcaError {
    // -- Request errors --
    #[error("no file uploaded")]
    MissingUpload,

    #[error("no file selected")]
    EmptyFilename,

    #[error("service unavailable outside working hours")]
    OutsideServiceWindow,

    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },

    // -- Document errors --
    #[error("invalid input document: {0}")]
    InvalidInputDocument(String),

    #[error("rear frame unresolved: {0}")]
    UnresolvedRearResource(String),

    #[error("frame resource unavailable: {0}")]
    FrameResource(String),

    #[error("page import failed: {0}")]
    PageImport(String),

    #[error("stamp generation failed: {0}")]
    StampGeneration(String),

    #[error("failed to serialise composed document: {0}")]
    Serialization(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnmarcaError>;
