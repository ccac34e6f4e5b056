// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job status stream: where admission and the worker publish progress events.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::{debug, warn};

use labelwerk_core::status::Status;
use labelwerk_core::types::JobId;

/// Receiver of job progress events.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: Status);
}

/// In-memory status registry, queried by the HTTP layer.
///
/// Keeps every event per job. Once a job has published a terminal
/// (`done`) event, later events for it are dropped. Only the most recent
/// `retention` finished jobs are remembered; jobs still in flight are
/// never evicted.
pub struct StatusBoard {
    inner: Mutex<Jobs>,
    retention: usize,
}

#[derive(Default)]
struct Jobs {
    events: HashMap<JobId, Vec<Status>>,
    /// Finished jobs, oldest first.
    finished: VecDeque<JobId>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::with_retention(Self::DEFAULT_RETENTION)
    }
}

impl StatusBoard {
    pub const DEFAULT_RETENTION: usize = 1000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Board that forgets finished jobs beyond the newest `retention`.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            inner: Mutex::new(Jobs::default()),
            retention,
        }
    }

    /// The most recent event for `id`.
    pub fn latest(&self, id: &JobId) -> Option<Status> {
        let jobs = self.inner.lock().ok()?;
        jobs.events.get(id).and_then(|events| events.last().cloned())
    }

    /// Every event published for `id`, oldest first.
    pub fn history(&self, id: &JobId) -> Vec<Status> {
        self.inner
            .lock()
            .ok()
            .and_then(|jobs| jobs.events.get(id).cloned())
            .unwrap_or_default()
    }

    /// Number of jobs the board knows about.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|jobs| jobs.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatusSink for StatusBoard {
    fn publish(&self, status: Status) {
        let Ok(mut jobs) = self.inner.lock() else {
            warn!(job_id = %status.id, "status board lock poisoned, event dropped");
            return;
        };
        let id = status.id;
        let events = jobs.events.entry(id).or_default();
        if events.last().is_some_and(|last| last.done) {
            warn!(job_id = %id, step = %status.step, "event after terminal status ignored");
            return;
        }
        debug!(
            job_id = %id,
            step = %status.step,
            progress = status.progress,
            done = status.done,
            "job status"
        );
        let done = status.done;
        events.push(status);

        if done {
            jobs.finished.push_back(id);
            while jobs.finished.len() > self.retention {
                if let Some(evicted) = jobs.finished.pop_front() {
                    jobs.events.remove(&evicted);
                    debug!(job_id = %evicted, "finished job evicted from status board");
                }
            }
        }
    }
}
