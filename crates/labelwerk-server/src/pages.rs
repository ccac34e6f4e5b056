// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server-rendered HTML: the upload form and the per-job status page.

use axum::extract::{Path, State};
use axum::response::Html;
use html_escape::encode_safe;

use labelwerk_core::status::Status;

use crate::api::lookup_status;
use crate::error::ApiError;
use crate::state::AppState;

const STYLE: &str = "body{font-family:sans-serif;max-width:40em;margin:2em auto}\
    progress{width:100%}.error{color:#b00020}img{max-width:100%;border:1px solid #ccc}";

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX)
}

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Labelwerk</title></head>
<body>
<h1>Labelwerk</h1>
<form action="/api/print" method="post" enctype="multipart/form-data">
  <p><input type="file" name="file" required></p>
  <p>
    <label>Width <input type="number" name="x" min="1" required></label>
    <label>Height <input type="number" name="y" min="1" required></label>
    <label>Labels <input type="number" name="pf" min="0" value="1"></label>
  </p>
  <p>
    <label><input type="checkbox" name="rotate"> rotate</label>
    <label><input type="checkbox" name="resize"> resize</label>
    <label><input type="checkbox" name="stretch"> stretch</label>
    <label><input type="checkbox" name="centerh"> center horizontally</label>
    <label><input type="checkbox" name="centerv"> center vertically</label>
    <label><input type="checkbox" name="public"> public</label>
  </p>
  <p>
    <label>Dither
      <select name="dither">
        <option value="">none</option>
        <option value="o4x4">clustered dot 4x4</option>
        <option value="bayer">bayer 3x3</option>
        <option value="noise">random noise</option>
      </select>
    </label>
  </p>
  <p><button type="submit">Print</button></p>
</form>
</body>
</html>
"#;

/// Render the status page for one job.
pub fn render_job(status: &Status) -> String {
    let id = status.id;
    let refresh = if status.done {
        String::new()
    } else {
        "<meta http-equiv=\"refresh\" content=\"1\">".to_owned()
    };
    let progress = if status.is_error() {
        format!("<p class=\"error\">{}</p>", encode_safe(&status.step))
    } else {
        format!(
            "<p>{}</p><progress value=\"{:.3}\" max=\"1\"></progress>",
            encode_safe(&status.step),
            status.progress
        )
    };
    let preview = if status.reload == Some(true) {
        format!("<p><img src=\"/img/{id}\" alt=\"processed label\"></p>")
    } else {
        String::new()
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">{refresh}\
         <title>Job {id}</title><style>{STYLE}</style></head>\n\
         <body>\n<h1>Job {id}</h1>\n{progress}\n{preview}\n\
         <p><a href=\"/\">print another</a></p>\n</body>\n</html>\n"
    )
}

/// `GET /job/{id}`
pub async fn job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let status = lookup_status(&state, &id)?;
    Ok(Html(render_job(&status)))
}
