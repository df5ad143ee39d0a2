// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame resources — region code extraction, rear frame lookup, and a
// process-wide cache of parsed frame PDFs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use enmarca_core::config::OverlayConfig;
use enmarca_core::error::{EnmarcaError, Result};
use enmarca_core::regions::StateCodeTable;
use tracing::{debug, info, instrument};

use crate::pdf::reader::SourceDocument;

/// Character range of the region code inside a base name.
const REGION_CODE_SPAN: std::ops::Range<usize> = 11..13;

/// Final path component of an uploaded filename, accepting either slash.
pub fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// The two-character region code at positions 11..13 of the base name,
/// upper-cased. `None` when the name is too short.
pub fn region_code(filename: &str) -> Option<String> {
    let code: String = base_name(filename)
        .chars()
        .skip(REGION_CODE_SPAN.start)
        .take(REGION_CODE_SPAN.len())
        .collect();
    (code.chars().count() == REGION_CODE_SPAN.len()).then(|| code.to_uppercase())
}

/// Maps an uploaded filename to the rear frame of its region.
#[derive(Debug, Clone)]
pub struct StateFrameResolver {
    frames_dir: PathBuf,
    extension: String,
}

impl StateFrameResolver {
    pub fn new(frames_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(&config.frames_dir, &config.frame_extension)
    }

    /// Resolve the rear frame for `filename`, saying why when there is none.
    pub fn try_resolve(&self, filename: &str) -> Result<PathBuf> {
        let code = region_code(filename).ok_or_else(|| {
            EnmarcaError::UnresolvedRearResource(format!(
                "filename {:?} is too short to carry a region code",
                base_name(filename)
            ))
        })?;
        let region = StateCodeTable::name(&code).ok_or_else(|| {
            EnmarcaError::UnresolvedRearResource(format!("unknown region code {:?}", code))
        })?;

        let path = self
            .frames_dir
            .join(format!("{}.{}", code, self.extension));
        if !path.is_file() {
            return Err(EnmarcaError::UnresolvedRearResource(format!(
                "no rear frame for {} at {}",
                region,
                path.display()
            )));
        }
        debug!(%code, region, "Rear frame resolved");
        Ok(path)
    }

    /// Resolve the rear frame for `filename`, or `None` when the rear pass
    /// should be skipped.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        match self.try_resolve(filename) {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(%err, "No rear frame");
                None
            }
        }
    }
}

/// Parsed frame PDFs keyed by path, loaded on first use and shared between
/// compositions.
#[derive(Default)]
pub struct FrameCache {
    entries: RwLock<HashMap<PathBuf, Arc<SourceDocument>>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parsed document at `path`, opening it if this is the first request.
    /// Load failures are not cached.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<SourceDocument>> {
        {
            let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(document) = entries.get(path) {
                return Ok(Arc::clone(document));
            }
        }

        let document = Arc::new(SourceDocument::open(path)?);
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let cached = Arc::clone(
            entries
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::clone(&document)),
        );
        info!(cached = entries.len(), "Frame cached");
        Ok(cached)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_pdf;

    #[test]
    fn base_name_strips_either_separator() {
        assert_eq!(base_name("uploads/2024/ACTA0000001JCX.pdf"), "ACTA0000001JCX.pdf");
        assert_eq!(base_name(r"C:\scans\ACTA0000001JCX.pdf"), "ACTA0000001JCX.pdf");
        assert_eq!(base_name("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn region_code_reads_positions_eleven_and_twelve() {
        assert_eq!(region_code("ACTA0000001jc.pdf").as_deref(), Some("JC"));
        assert_eq!(region_code("dir/ACTA0000001NL.pdf").as_deref(), Some("NL"));
        assert_eq!(region_code("ACTA0000001J"), None);
        assert_eq!(region_code("short.pdf"), None);
    }

    #[test]
    fn resolves_existing_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_pdf(&dir.path().join("JC.pdf"), &[(612.0, 792.0)]);
        let resolver = StateFrameResolver::new(dir.path(), "pdf");

        let path = resolver.resolve("ACTA0000001JC.pdf").unwrap();
        assert_eq!(path, dir.path().join("JC.pdf"));
    }

    #[test]
    fn unknown_code_and_missing_file_are_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = StateFrameResolver::new(dir.path(), "pdf");

        assert!(matches!(
            resolver.try_resolve("ACTA0000001ZZ.pdf"),
            Err(EnmarcaError::UnresolvedRearResource(_))
        ));
        assert!(matches!(
            resolver.try_resolve("ACTA0000001JC.pdf"),
            Err(EnmarcaError::UnresolvedRearResource(_))
        ));
        assert!(resolver.resolve("tiny.pdf").is_none());
    }

    #[test]
    fn cache_loads_each_frame_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NL.pdf");
        write_pdf(&path, &[(612.0, 792.0)]);

        let cache = FrameCache::new();
        let first = cache.get_or_load(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_does_not_keep_failures() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FrameCache::new();
        assert!(cache.get_or_load(&dir.path().join("missing.pdf")).is_err());
        assert_eq!(cache.len(), 0);
    }
}
