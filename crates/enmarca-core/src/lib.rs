// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enmarca — Core types, configuration and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod regions;
pub mod rejection;
pub mod types;

pub use config::{OverlayConfig, ServiceWindow};
pub use error::{EnmarcaError, Result};
pub use regions::StateCodeTable;
pub use rejection::{Rejection, RejectionCategory};
pub use types::*;
