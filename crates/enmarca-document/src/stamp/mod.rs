// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stamp module — QR and Code-128 rasters placed on composed pages.

pub mod barcode;
pub mod qr;

pub use barcode::{BarcodeRenderer, BarcodeStampGenerator};
pub use qr::QrStampGenerator;
