// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay service — the single entry point of the pipeline.
//
// Order of checks: working-hours gate, upload presence, filename, then
// composition. Nothing is parsed or allocated before the gate admits the
// request, and no bytes leave unless every step succeeded.

use std::sync::Arc;
use std::time::Instant;

use enmarca_core::config::OverlayConfig;
use enmarca_core::error::EnmarcaError;
use enmarca_core::rejection::Rejection;
use enmarca_core::types::{
    ComposedOutput, Deadline, FrameOverlayOptions, InvocationId, PDF_MEDIA_TYPE, UploadedDocument,
};
use enmarca_document::PdfCompositor;
use tracing::{info, info_span, warn};

use crate::gate::{Clock, SystemClock, WorkingHoursGate};
use crate::integrity::fingerprint;

pub struct PdfOverlayService {
    gate: WorkingHoursGate,
    compositor: PdfCompositor,
    clock: Arc<dyn Clock>,
}

impl PdfOverlayService {
    pub fn new(gate: WorkingHoursGate, compositor: PdfCompositor) -> Self {
        Self {
            gate,
            compositor,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build a service from validated configuration.
    pub fn from_config(config: &OverlayConfig) -> enmarca_core::Result<Self> {
        config.validate()?;
        Ok(Self::new(
            WorkingHoursGate::from_config(config)?,
            PdfCompositor::from_config(config),
        ))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Frame `upload` and return the finished PDF.
    ///
    /// `None` or an empty byte buffer counts as no upload at all.
    pub fn handle(
        &self,
        upload: Option<UploadedDocument>,
        options: FrameOverlayOptions,
    ) -> Result<ComposedOutput, Rejection> {
        self.run(upload, options, Deadline::none())
    }

    /// As [`handle`](Self::handle), abandoning all work once `deadline`
    /// passes.
    pub fn handle_until(
        &self,
        upload: Option<UploadedDocument>,
        options: FrameOverlayOptions,
        deadline: Instant,
    ) -> Result<ComposedOutput, Rejection> {
        self.run(upload, options, Deadline::at(deadline))
    }

    fn run(
        &self,
        upload: Option<UploadedDocument>,
        options: FrameOverlayOptions,
        deadline: Deadline,
    ) -> Result<ComposedOutput, Rejection> {
        let invocation = InvocationId::new();
        let span = info_span!(
            "overlay",
            %invocation,
            filename = upload.as_ref().map_or("", |u| u.filename.as_str()),
            front = options.apply_front,
            rear = options.apply_rear,
            folio = options.apply_folio
        );
        let _guard = span.enter();

        self.process(upload, options, deadline).map_err(|err| {
            let rejection = Rejection::from(&err);
            warn!(%err, category = ?rejection.category, "Request rejected");
            rejection
        })
    }

    fn process(
        &self,
        upload: Option<UploadedDocument>,
        options: FrameOverlayOptions,
        deadline: Deadline,
    ) -> enmarca_core::Result<ComposedOutput> {
        if !self.gate.admits(self.clock.now()) {
            return Err(EnmarcaError::OutsideServiceWindow);
        }

        let upload = upload
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or(EnmarcaError::MissingUpload)?;
        if upload.filename.is_empty() {
            return Err(EnmarcaError::EmptyFilename);
        }
        info!(
            input_sha256 = %fingerprint(&upload.bytes),
            bytes = upload.bytes.len(),
            "Upload accepted"
        );

        let composed = self.compositor.compose_until(&upload, options, deadline)?;
        let folio = composed.folio();
        let bytes = composed.into_bytes()?;
        deadline.check("emission")?;

        info!(
            output_sha256 = %fingerprint(&bytes),
            bytes = bytes.len(),
            "Document emitted"
        );
        Ok(ComposedOutput {
            bytes,
            filename: upload.output_filename(),
            media_type: PDF_MEDIA_TYPE,
            folio,
        })
    }
}
