// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EnmarcaError, Result};

/// When the service accepts requests, in local time of the configured zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ServiceWindow {
    /// Requests are admitted at any time of day.
    #[default]
    AlwaysOpen,
    /// Requests are admitted for local times in `[start, end)`. A window
    /// with `start > end` wraps past midnight.
    Daily { start: NaiveTime, end: NaiveTime },
}

impl ServiceWindow {
    /// The 09:00–17:00 office-hours window.
    pub fn office_hours() -> Self {
        Self::Daily {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Settings for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Background template drawn under the uploaded pages.
    pub background_template: PathBuf,
    /// Directory holding one rear frame per region code.
    pub frames_dir: PathBuf,
    /// Extension of the rear frame files, without the dot.
    pub frame_extension: String,
    /// IANA time zone the service window is evaluated in.
    pub time_zone: String,
    pub service_window: ServiceWindow,
    /// Rasterisation density used for the barcode stamp.
    pub barcode_dpi: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            background_template: PathBuf::from("static/marcoparaactas.pdf"),
            frames_dir: PathBuf::from("static/marcostraceros"),
            frame_extension: "pdf".into(),
            time_zone: "America/Mexico_City".into(),
            service_window: ServiceWindow::default(),
            barcode_dpi: 300.0,
        }
    }
}

impl OverlayConfig {
    /// Read and validate a JSON configuration file. Missing keys take their
    /// default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed time zone.
    pub fn tz(&self) -> Result<Tz> {
        self.time_zone.parse::<Tz>().map_err(|err| {
            EnmarcaError::Config(format!("unknown time zone {:?}: {err}", self.time_zone))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if let ServiceWindow::Daily { start, end } = self.service_window
            && start == end
        {
            return Err(EnmarcaError::Config(format!(
                "service window starts and ends at {start}; use always_open for a full day"
            )));
        }
        if self.frame_extension.is_empty() || self.frame_extension.contains('.') {
            return Err(EnmarcaError::Config(format!(
                "frame extension {:?} must be a bare extension such as \"pdf\"",
                self.frame_extension
            )));
        }
        if !(self.barcode_dpi.is_finite() && self.barcode_dpi >= 72.0) {
            return Err(EnmarcaError::Config(format!(
                "barcode dpi {} must be at least 72",
                self.barcode_dpi
            )));
        }
        Ok(())
    }
}
