// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON and upload endpoints.
//
// Both print routes answer 200 with a job id no matter what was sent.
// Problems with the upload itself end up in that job's status stream.

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use labelwerk_core::status::Status;
use labelwerk_core::types::{ImageId, JobId};
use labelwerk_print::{ListQuery, PrintRequest, RequestParams};

use crate::error::ApiError;
use crate::state::AppState;

/// Largest page size accepted by `/api/list`.
pub const MAX_LIST_LIMIT: u64 = 100;

fn join_error(err: JoinError) -> ApiError {
    ApiError::internal(format!("background task failed: {err}"))
}

async fn submit(state: &AppState, request: PrintRequest) -> Result<JobId, ApiError> {
    let admission = state.admission.clone();
    tokio::task::spawn_blocking(move || admission.submit(request))
        .await
        .map_err(join_error)
}

// ---------------------------------------------------------------------------
// Print submission
// ---------------------------------------------------------------------------

/// `PUT /api/print`: raw image body, options in the query string.
pub async fn print_raw(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Body,
) -> Result<Response, ApiError> {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            warn!(error = %rejection, "unparseable query string, ignoring options");
            Vec::new()
        }
    };
    let body = axum::body::to_bytes(body, state.max_upload_bytes)
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| e.to_string());

    let id = submit(
        &state,
        PrintRequest {
            body,
            params: RequestParams::from_query(pairs),
            filename: None,
        },
    )
    .await?;

    info!(job_id = %id, "[PUT] print job submitted");
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("job id: {id}\n"),
    )
        .into_response())
}

/// `POST /api/print`: multipart form with a `file` field.
pub async fn print_form(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request = read_form(multipart).await;
    if let Some(name) = &request.filename {
        debug!(file = %name, "multipart upload");
    }
    let id = submit(&state, request).await?;

    info!(job_id = %id, "[POST] print job submitted");
    Ok(Html(format!(
        "<head>\n  <meta http-equiv=\"Refresh\" content=\"0; URL=/job/{id}\" />\n</head>\n"
    ))
    .into_response())
}

/// Collect the upload and option fields of a multipart body.
async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> PrintRequest {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return PrintRequest {
                body: Err(rejection.to_string()),
                params: RequestParams::from_form(std::iter::empty::<(String, String)>()),
                filename: None,
            };
        }
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut file: Option<Vec<u8>> = None;
    let mut filename = None;
    let mut failure = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        };
        let name = field.name().unwrap_or_default().to_owned();
        if name == "file" {
            if file.is_some() {
                continue;
            }
            filename = field.file_name().map(str::to_owned);
            match field.bytes().await {
                Ok(bytes) => file = Some(bytes.to_vec()),
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        } else {
            match field.text().await {
                Ok(value) => pairs.push((name, value)),
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }
    }

    let body = match (failure, file) {
        (Some(err), _) => Err(err),
        (None, Some(bytes)) => Ok(bytes),
        (None, None) => Err("no file field in upload".to_owned()),
    };
    PrintRequest {
        body,
        params: RequestParams::from_form(pairs),
        filename,
    }
}

// ---------------------------------------------------------------------------
// Status and images
// ---------------------------------------------------------------------------

pub(crate) fn lookup_status(state: &AppState, raw_id: &str) -> Result<Status, ApiError> {
    let id: JobId = raw_id.parse()?;
    state
        .status
        .latest(&id)
        .ok_or_else(|| ApiError::not_found(format!("job {id} not found")))
}

/// `GET /api/job/{id}`: latest status event as JSON.
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Status>, ApiError> {
    lookup_status(&state, &id).map(Json)
}

/// `GET /img/{id}`: stored image bytes.
pub async fn image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id: ImageId = id.parse()?;
    let store = state.store.clone();
    let image = tokio::task::spawn_blocking(move || store.get(&id))
        .await
        .map_err(join_error)??
        .ok_or_else(|| ApiError::not_found(format!("image {id} not found")))?;

    let etag = format!("\"{}\"", image.digest);
    let fresh = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if fresh {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type().to_owned()),
            (header::ETAG, etag),
        ],
        image.data,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    offset: Option<String>,
    limit: Option<String>,
    all: Option<String>,
    processed: Option<String>,
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<u64, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::bad_request("Invalid or missing offset or limit!"))?;
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|e| ApiError::bad_request(format!("invalid {name}: {e}")))?;
    if value > i32::MAX as u32 {
        return Err(ApiError::bad_request(format!("invalid {name}: out of range")));
    }
    Ok(u64::from(value))
}

/// `GET /api/list`: one page of image records, or every record as
/// newline-delimited JSON with `?all`.
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let processed = params
        .processed
        .as_deref()
        .map(|v| matches!(v, "on" | "true"));

    let query = if params.all.is_some() {
        ListQuery {
            offset: 0,
            limit: None,
            processed,
        }
    } else {
        let offset = parse_bound("offset", params.offset.as_deref())?;
        let limit = parse_bound("limit", params.limit.as_deref())?;
        if limit > MAX_LIST_LIMIT {
            return Err(ApiError::bad_request(format!(
                "Invalid limit; limit > {MAX_LIST_LIMIT}"
            )));
        }
        ListQuery {
            offset,
            limit: Some(limit),
            processed,
        }
    };

    let store = state.store.clone();
    let page = tokio::task::spawn_blocking(move || store.list(&query))
        .await
        .map_err(join_error)??;

    if params.all.is_none() {
        return Ok(Json(page).into_response());
    }

    let mut body = String::new();
    for image in &page.images {
        let line = serde_json::to_string(image)
            .map_err(|e| ApiError::internal(format!("serialize image: {e}")))?;
        body.push_str(&line);
        body.push('\n');
    }
    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response())
}

/// `GET /healthz`
pub async fn health() -> &'static str {
    "ok"
}
