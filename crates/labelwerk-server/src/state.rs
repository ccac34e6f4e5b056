// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared state handed to every HTTP handler.

use std::sync::Arc;

use labelwerk_print::{Admission, ImageStore, StatusBoard};

/// Everything the routes need. All fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub admission: Admission,
    pub status: Arc<StatusBoard>,
    pub store: Arc<dyn ImageStore>,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        admission: Admission,
        status: Arc<StatusBoard>,
        store: Arc<dyn ImageStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            admission,
            status,
            store,
            max_upload_bytes,
        }
    }
}
