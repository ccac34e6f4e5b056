// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Full path: submission -> queue -> worker -> printer wire bytes.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};

use labelwerk_core::config::PipelineConfig;
use labelwerk_core::types::ImageId;
use labelwerk_document::encode_png;
use labelwerk_print::{
    Device, FingerprintPrinter, ImageStore, Link, Pipeline, PrintRequest, RequestParams,
    SqliteImageStore, StatusBoard,
};

/// Link that copies every write into a shared buffer.
#[derive(Clone, Default)]
struct TapLink {
    wire: Arc<Mutex<Vec<u8>>>,
}

#[async_trait]
impl Link for TapLink {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.wire.lock().expect("wire").extend_from_slice(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn landscape_label_is_stretched_printed_and_fed_twice() {
    let board = Arc::new(StatusBoard::new());
    let store = Arc::new(SqliteImageStore::open_in_memory().expect("store"));
    let tap = TapLink::default();
    let printer = FingerprintPrinter::new(tap.clone(), 4096);

    let pipeline = Pipeline::start(
        &PipelineConfig::default(),
        store.clone(),
        board.clone(),
        Device::Printer(Box::new(printer)),
    );

    let source = encode_png(&DynamicImage::new_rgb8(800, 400)).expect("encode");
    let id = pipeline.admission().submit(PrintRequest {
        body: Ok(source),
        params: RequestParams::from_query([
            ("x", "400"),
            ("y", "200"),
            ("resize", ""),
            ("stretch", ""),
            ("pf", "2"),
        ]),
        filename: Some("shipping.png".into()),
    });
    pipeline.shutdown().await.expect("shutdown");

    let last = board.latest(&id).expect("status");
    assert!(last.done);
    assert_eq!(last.progress, 1.0);

    let progress: Vec<f32> = board
        .history(&id)
        .iter()
        .skip(1)
        .map(|s| s.progress)
        .collect();
    let expected: Vec<f32> = (1..=8).map(|n| n as f32 / 8.0).collect();
    assert_eq!(progress, expected);

    let processed = store
        .get(&ImageId::from(id))
        .expect("get")
        .expect("processed image");
    let rendered = image::load_from_memory(&processed.data).expect("decode");
    assert_eq!(rendered.dimensions(), (400, 200));

    let wire = tap.wire.lock().expect("wire").clone();
    let text = String::from_utf8_lossy(&wire);
    assert_eq!(text.matches("PF\r\n").count(), 2);
    assert!(text.ends_with("PF\r\nPF\r\n"));
    assert!(text.starts_with("PRPOS 0,0\r\nPRBUF "));

    // 400 px -> 50 bytes per row, 200 rows.
    let payload: usize = text
        .match_indices("PRBUF ")
        .map(|(at, _)| {
            let rest = &text[at + 6..];
            let end = rest.find('\r').expect("terminated");
            rest[..end].parse::<usize>().expect("length")
        })
        .sum();
    assert_eq!(payload, 50 * 200);
}

#[tokio::test]
async fn rejected_and_accepted_jobs_do_not_interfere() {
    let board = Arc::new(StatusBoard::new());
    let store = Arc::new(SqliteImageStore::open_in_memory().expect("store"));
    let pipeline = Pipeline::start(
        &PipelineConfig {
            queue_capacity: 4,
            ..PipelineConfig::default()
        },
        store.clone(),
        board.clone(),
        Device::Simulated {
            delay: std::time::Duration::from_millis(1),
        },
    );
    let admission = pipeline.admission();

    let bad = admission.submit(PrintRequest {
        body: Ok(b"GIF89a-but-not-really".to_vec()),
        params: RequestParams::from_query([("x", "10"), ("y", "10")]),
        filename: None,
    });
    let good = admission.submit(PrintRequest {
        body: Ok(encode_png(&DynamicImage::new_rgb8(10, 10)).expect("encode")),
        params: RequestParams::from_form([("x", "10"), ("y", "10"), ("rotate", "on")]),
        filename: None,
    });
    drop(admission);
    pipeline.shutdown().await.expect("shutdown");

    let bad = board.latest(&bad).expect("status");
    assert!(bad.is_error() && bad.done);
    let good = board.latest(&good).expect("status");
    assert!(!good.is_error() && good.done);
    assert_eq!(store.count(Some(true)).expect("count"), 1);
}
