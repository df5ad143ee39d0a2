// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Working-hours gate — admits requests by local time of day.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use enmarca_core::config::{OverlayConfig, ServiceWindow};
use enmarca_core::error::Result;
use tracing::debug;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingHoursGate {
    tz: Tz,
    window: ServiceWindow,
}

impl WorkingHoursGate {
    pub fn new(tz: Tz, window: ServiceWindow) -> Self {
        Self { tz, window }
    }

    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        Ok(Self::new(config.tz()?, config.service_window))
    }

    /// Whether a request arriving at `now` is served.
    pub fn admits(&self, now: DateTime<Utc>) -> bool {
        let ServiceWindow::Daily { start, end } = self.window else {
            return true;
        };
        let local = now.with_timezone(&self.tz).time();
        let admitted = within(local, start, end);
        debug!(%local, %start, %end, admitted, "Service window checked");
        admitted
    }
}

/// `start <= t < end`, wrapping past midnight when `start > end`.
fn within(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        start <= t && t < end
    } else {
        t >= start || t < end
    }
}
