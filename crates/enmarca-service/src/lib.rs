// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// enmarca-service — Entry point of the Enmarca framing pipeline.
//
// Wraps the compositor with the working-hours gate, upload validation,
// document fingerprints for the logs, and the mapping of failures to
// caller-facing rejections. Transport (HTTP routing, sessions) lives in the
// host application.

pub mod gate;
pub mod integrity;
pub mod service;

pub use gate::{Clock, FixedClock, SystemClock, WorkingHoursGate};
pub use integrity::fingerprint;
pub use service::PdfOverlayService;
