// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded in-memory job queue between admission and the pipeline worker.
//
// Producers never wait: when the queue is full the job is shed. Jobs are
// not persisted; anything still queued at exit is lost.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use labelwerk_core::error::{LabelwerkError, Result};

use crate::job::PrintJob;

/// Producer handle. Cheap to clone; one per submitting context.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<PrintJob>,
}

/// Consumer handle, owned by the single worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::Receiver<PrintJob>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` jobs (minimum one).
    pub fn bounded(capacity: usize) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, JobReceiver { rx })
    }

    /// Enqueue without waiting.
    pub fn try_enqueue(&self, job: PrintJob) -> Result<()> {
        let id = job.id;
        match self.tx.try_send(job) {
            Ok(()) => {
                debug!(job_id = %id, queued = self.len(), "job enqueued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(LabelwerkError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(LabelwerkError::PipelineStopped),
        }
    }

    /// Jobs waiting to be processed.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl JobReceiver {
    /// Wait for the next job. `None` once every producer is gone and the
    /// queue is drained.
    pub async fn next(&mut self) -> Option<PrintJob> {
        self.rx.recv().await
    }
}
