// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelwerk Server: HTTP routes over the print pipeline.

pub mod api;
pub mod cli;
pub mod error;
pub mod pages;
pub mod services;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};

pub use error::ApiError;
pub use services::Services;
pub use state::AppState;

/// Build the router for `state`.
pub fn app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(pages::index))
        .route("/api/print", put(api::print_raw).post(api::print_form))
        .route("/api/job/{id}", get(api::job_status))
        .route("/job/{id}", get(pages::job))
        .route("/img/{id}", get(api::image))
        .route("/api/list", get(api::list))
        .route("/healthz", get(api::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
