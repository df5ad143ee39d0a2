// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio allocation.

use enmarca_core::types::{FOLIO_MAX, FOLIO_MIN, Folio};
use rand::Rng;

/// Source of folio numbers, one per composed document.
///
/// Implementations must be safe to call from concurrent compositions.
pub trait FolioSource: Send + Sync {
    fn allocate(&self) -> Folio;
}

/// Draws folios uniformly from the six-digit range using the thread-local
/// generator. Numbers are not guaranteed unique across calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct FolioAllocator;

impl FolioAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Draw a folio from a caller-supplied generator.
    pub fn allocate_with<R: Rng + ?Sized>(rng: &mut R) -> Folio {
        Folio::clamped(rng.gen_range(FOLIO_MIN..=FOLIO_MAX))
    }
}

impl FolioSource for FolioAllocator {
    fn allocate(&self) -> Folio {
        Self::allocate_with(&mut rand::thread_rng())
    }
}
