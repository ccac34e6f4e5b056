// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelwerk Print: job admission, the bounded job queue, the processing
// pipeline, the image database, and the printer connection. This crate
// joins the domain types in `labelwerk-core` and the transforms in
// `labelwerk-document` to a physical label printer.

pub mod admission;
pub mod connection;
pub mod job;
pub mod link;
pub mod pipeline;
pub mod printer;
pub mod protocol;
pub mod queue;
pub mod status;
pub mod store;

pub use admission::Admission;
pub use connection::{ConnectionManager, DeviceDialer, Dialer, Established, RetryPolicy};
pub use job::{PrintJob, PrintRequest, RequestParams};
pub use link::{Link, SerialLink, TcpLink};
pub use pipeline::{Device, Pipeline};
pub use printer::{FingerprintPrinter, LabelPrinter, Tone};
pub use queue::JobQueue;
pub use status::{StatusBoard, StatusSink};
pub use store::{ImagePage, ImageStore, ListQuery, SqliteImageStore};
