// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job admission: validate a submission, store the upload, and hand the job
// to the queue.
//
// Submitters always get a job id back. Rejections never surface as an
// error to the caller; they end the job's status stream instead.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::status::Status;
use labelwerk_core::types::{JobId, StoredImage};
use labelwerk_document::probe_header;

use crate::job::{PrintJob, PrintRequest};
use crate::queue::JobQueue;
use crate::status::StatusSink;
use crate::store::ImageStore;

/// Front door of the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Admission {
    queue: JobQueue,
    store: Arc<dyn ImageStore>,
    status: Arc<dyn StatusSink>,
    /// Pixel budget for both the label canvas and the uploaded image.
    max_pixels: u64,
}

impl Admission {
    pub fn new(
        queue: JobQueue,
        store: Arc<dyn ImageStore>,
        status: Arc<dyn StatusSink>,
        max_pixels: u64,
    ) -> Self {
        Self {
            queue,
            store,
            status,
            max_pixels,
        }
    }

    /// Admit `request` and return its job id.
    ///
    /// Blocks on the image store; call from `spawn_blocking` in async code.
    pub fn submit(&self, request: PrintRequest) -> JobId {
        let id = JobId::new();
        self.status.publish(Status::queued(id));
        if let Err(err) = self.admit(id, request) {
            warn!(job_id = %id, error = %err, "job rejected");
            self.status.publish(Status::failed(id, err.message()));
        }
        id
    }

    #[instrument(skip(self, request), fields(job_id = %id))]
    fn admit(&self, id: JobId, request: PrintRequest) -> Result<()> {
        let PrintRequest {
            body,
            params,
            filename,
        } = request;

        let data = body.map_err(|e| {
            LabelwerkError::InvalidRequest(format!("Invalid File Upload: {e}"))
        })?;
        let page_feeds = params.page_feeds()?;
        let label = params.label_size()?;
        if label.pixels() > self.max_pixels {
            return Err(LabelwerkError::InvalidRequest(format!(
                "Label Too Large: {label} exceeds {} pixels",
                self.max_pixels
            )));
        }
        let header = probe_header(&data).map_err(|e| {
            LabelwerkError::InvalidRequest(format!(
                "Failed to Decode Image (header): {}",
                e.message()
            ))
        })?;
        if header.pixels() > self.max_pixels {
            return Err(LabelwerkError::InvalidRequest(format!(
                "Failed to Decode Image (header): {}x{} image exceeds {} pixels",
                header.width, header.height, self.max_pixels
            )));
        }
        let format = header.format_tag();

        let public = params.public();
        let mut original = StoredImage::unprocessed(data, &format, public, filename.clone());
        self.store.insert(&original).map_err(|e| {
            LabelwerkError::InvalidRequest(format!("Failed to store image: {}", e.message()))
        })?;

        let job = PrintJob {
            id,
            data: std::mem::take(&mut original.data),
            format,
            label,
            page_feeds,
            options: params.options(),
            filter: params.filter(),
            public,
            name: filename,
            original: original.id,
        };
        let format = job.format.clone();
        self.queue.try_enqueue(job)?;

        info!(
            format = %format,
            width = header.width,
            height = header.height,
            label = %label,
            page_feeds,
            "image received"
        );
        Ok(())
    }

    /// Jobs currently waiting.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
