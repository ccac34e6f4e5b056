// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print pipeline: the single worker that turns queued uploads into labels.
//
// Jobs run one at a time, in arrival order, through eight stages:
//
//   decode -> rotate -> resize -> center -> dither -> save -> transmit -> done
//
// A status event is published before each stage, whether or not the stage
// has work to do. Pixel work runs on the blocking pool; the worker awaits
// it, so a job holds the worker until it finishes or fails.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use labelwerk_core::config::PipelineConfig;
use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::status::{Stage, Status};
use labelwerk_core::types::{ImageId, JobId, StoredImage};
use labelwerk_document::{ImageProcessor, encode_png};

use crate::admission::Admission;
use crate::job::PrintJob;
use crate::printer::LabelPrinter;
use crate::queue::{JobQueue, JobReceiver};
use crate::status::StatusSink;
use crate::store::ImageStore;

/// Where finished labels go.
pub enum Device {
    /// A connected printer, owned by the worker.
    Printer(Box<dyn LabelPrinter>),
    /// No hardware: transmission is replaced by a pause.
    Simulated { delay: Duration },
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Printer(_) => f.write_str("Printer"),
            Self::Simulated { delay } => {
                f.debug_struct("Simulated").field("delay", delay).finish()
            }
        }
    }
}

/// A running pipeline: its queue, its admission front door, and its worker.
pub struct Pipeline {
    admission: Admission,
    worker: JoinHandle<()>,
}

impl Pipeline {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn start(
        config: &PipelineConfig,
        store: Arc<dyn ImageStore>,
        status: Arc<dyn StatusSink>,
        device: Device,
    ) -> Self {
        let (queue, jobs) = JobQueue::bounded(config.queue_capacity);
        let max_pixels = config.max_label_pixels;
        info!(
            capacity = queue.capacity(),
            max_pixels,
            device = ?device,
            "starting print pipeline"
        );

        let worker = Worker {
            jobs,
            store: store.clone(),
            status: status.clone(),
            device,
            max_pixels,
        };
        Self {
            admission: Admission::new(queue, store, status, max_pixels),
            worker: tokio::spawn(worker.run()),
        }
    }

    /// Handle for submitting jobs.
    pub fn admission(&self) -> Admission {
        self.admission.clone()
    }

    /// Stop accepting work and wait for queued jobs to finish.
    ///
    /// Returns once every other [`Admission`] handle has been dropped too.
    pub async fn shutdown(self) -> Result<()> {
        let Self { admission, worker } = self;
        drop(admission);
        worker
            .await
            .map_err(|e| LabelwerkError::Image(format!("pipeline worker failed: {e}")))
    }
}

struct Worker {
    jobs: JobReceiver,
    store: Arc<dyn ImageStore>,
    status: Arc<dyn StatusSink>,
    device: Device,
    max_pixels: u64,
}

impl Worker {
    async fn run(mut self) {
        while let Some(job) = self.jobs.next().await {
            let id = job.id;
            if let Err(err) = self.process(job).await {
                warn!(job_id = %id, error = %err, "job failed");
                self.status.publish(Status::failed(id, err.message()));
            }
        }
        info!("print pipeline stopped");
    }

    fn enter(&self, id: JobId, stage: Stage) {
        debug!(job_id = %id, stage = ?stage, "entering stage");
        self.status.publish(Status::stage(id, stage));
    }

    #[instrument(skip_all, fields(job_id = %job.id, label = %job.label))]
    async fn process(&mut self, job: PrintJob) -> Result<()> {
        let PrintJob {
            id,
            data,
            label,
            page_feeds,
            options,
            filter,
            public,
            name,
            original,
            ..
        } = job;

        self.enter(id, Stage::Decode);
        let max_pixels = self.max_pixels;
        let mut image = blocking(move || {
            ImageProcessor::from_bytes_within(&data, max_pixels).map(ImageProcessor::into_dynamic)
        })
        .await?
        .map_err(|e| LabelwerkError::Image(format!("Failed to Decode Image: {}", e.message())))?;

        self.enter(id, Stage::Rotate);
        if options.rotate {
            image = transform(image, move |p| p.orient_to(label).0).await?;
        }

        self.enter(id, Stage::Resize);
        if options.resize {
            image = if options.stretch {
                transform(image, move |p| p.resize_stretch(label)).await?
            } else {
                transform(image, move |p| p.resize_fit(label)).await?
            };
        }

        self.enter(id, Stage::Center);
        if options.centers() {
            let (h, v) = (options.center_horizontal, options.center_vertical);
            image = transform(image, move |p| p.center_on(label, h, v)).await?;
        }

        self.enter(id, Stage::Dither);
        if let Some(filter) = filter {
            debug!(filter = filter.name(), "applying dither");
            image = blocking(move || filter.apply(image)).await?;
        }

        self.enter(id, Stage::Save);
        let processed = ProcessedLabel {
            id,
            public,
            name,
            original,
        };
        if let Err(err) = processed.save(self.store.clone(), &image).await {
            error!(job_id = %id, error = %err, "could not save processed image");
        }

        self.enter(id, Stage::Transmit);
        if page_feeds > 0 {
            self.transmit(&image, page_feeds).await?;
        }

        self.enter(id, Stage::Done);
        info!(job_id = %id, "job finished");
        Ok(())
    }

    async fn transmit(&mut self, image: &DynamicImage, page_feeds: u32) -> Result<()> {
        match &mut self.device {
            Device::Printer(printer) => {
                printer.print_chunked(image).await.map_err(|e| {
                    LabelwerkError::Transport(format!("Uploading Data: {}", e.message()))
                })?;
                printer.page_feed(page_feeds).await
            }
            Device::Simulated { delay } => {
                info!(
                    page_feeds,
                    width = image.width(),
                    height = image.height(),
                    "dry run, simulating print"
                );
                tokio::time::sleep(*delay).await;
                Ok(())
            }
        }
    }
}

/// Record metadata for a job's rendered label.
struct ProcessedLabel {
    id: JobId,
    public: bool,
    name: Option<String>,
    original: ImageId,
}

impl ProcessedLabel {
    /// Store the label as PNG under the job's id and link it to the upload.
    async fn save(self, store: Arc<dyn ImageStore>, image: &DynamicImage) -> Result<()> {
        let snapshot = image.clone();
        blocking(move || {
            let png = encode_png(&snapshot)?;
            let processed = StoredImage::processed(
                self.id.into(),
                png,
                "png",
                self.public,
                self.name,
                self.original,
            );
            store.insert(&processed)?;
            store.link_processed(&self.original, &processed.id)
        })
        .await?
    }
}

/// Run `f` on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LabelwerkError::Image(format!("image task failed: {e}")))
}

/// Apply one geometric transform on the blocking pool.
async fn transform<F>(image: DynamicImage, f: F) -> Result<DynamicImage>
where
    F: FnOnce(ImageProcessor) -> ImageProcessor + Send + 'static,
{
    blocking(move || f(ImageProcessor::from_dynamic(image)).into_dynamic()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{PrintRequest, RequestParams};
    use crate::printer::Tone;
    use crate::status::StatusBoard;
    use crate::store::SqliteImageStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Print(u32, u32),
        Feed(u32),
    }

    /// Printer that records calls and can fail uploads.
    struct RecordingPrinter {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_upload: bool,
    }

    #[async_trait]
    impl LabelPrinter for RecordingPrinter {
        async fn print_chunked(&mut self, image: &DynamicImage) -> Result<()> {
            if self.fail_upload {
                return Err(LabelwerkError::Transport("connection reset".into()));
            }
            self.calls
                .lock()
                .expect("calls")
                .push(Call::Print(image.width(), image.height()));
            Ok(())
        }

        async fn page_feed(&mut self, count: u32) -> Result<()> {
            self.calls.lock().expect("calls").push(Call::Feed(count));
            Ok(())
        }

        async fn beep(&mut self, _tones: &[Tone]) -> Result<()> {
            Ok(())
        }
    }

    struct Rig {
        pipeline: Pipeline,
        board: Arc<StatusBoard>,
        store: Arc<SqliteImageStore>,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    fn rig(fail_upload: bool) -> Rig {
        let board = Arc::new(StatusBoard::new());
        let store = Arc::new(SqliteImageStore::open_in_memory().expect("store"));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let printer = RecordingPrinter {
            calls: calls.clone(),
            fail_upload,
        };
        let pipeline = Pipeline::start(
            &settings(4),
            store.clone(),
            board.clone(),
            Device::Printer(Box::new(printer)),
        );
        Rig {
            pipeline,
            board,
            store,
            calls,
        }
    }

    fn settings(queue_capacity: usize) -> PipelineConfig {
        PipelineConfig {
            queue_capacity,
            ..PipelineConfig::default()
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode_png(&DynamicImage::new_rgb8(width, height)).expect("encode")
    }

    fn submit(rig: &Rig, body: Vec<u8>, pairs: &[(&str, &str)]) -> JobId {
        rig.pipeline.admission().submit(PrintRequest {
            body: Ok(body),
            params: RequestParams::from_query(pairs.iter().copied()),
            filename: None,
        })
    }

    async fn finish(rig: Rig) -> (Arc<StatusBoard>, Arc<SqliteImageStore>, Vec<Call>) {
        let Rig {
            pipeline,
            board,
            store,
            calls,
        } = rig;
        pipeline.shutdown().await.expect("shutdown");
        let calls = calls.lock().expect("calls").clone();
        (board, store, calls)
    }

    #[tokio::test]
    async fn stages_are_reported_in_order() {
        let rig = rig(false);
        let id = submit(&rig, png(30, 20), &[("x", "60"), ("y", "40")]);
        let (board, _, _) = finish(rig).await;

        let steps: Vec<String> = board.history(&id).into_iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            [
                "queued", "decode", "rotating", "resizing", "centering", "dithering", "saving",
                "printing", "done"
            ]
        );
        let last = board.latest(&id).expect("status");
        assert!(last.done);
        assert_eq!(last.progress, 1.0);
        assert_eq!(last.reload, Some(true));
    }

    #[tokio::test]
    async fn stretch_then_rotate_then_feed() {
        let rig = rig(false);
        let id = submit(
            &rig,
            png(20, 40),
            &[
                ("x", "80"),
                ("y", "30"),
                ("rotate", ""),
                ("resize", ""),
                ("stretch", ""),
                ("pf", "3"),
            ],
        );
        let (board, store, calls) = finish(rig).await;

        assert_eq!(calls, vec![Call::Print(80, 30), Call::Feed(3)]);
        assert_eq!(board.latest(&id).map(|s| s.progress), Some(1.0));

        let processed = store
            .get(&ImageId::from(id))
            .expect("get")
            .expect("processed image stored");
        assert!(processed.is_processed);
        let original = processed.unprocessed.expect("linked");
        let original = store.get(&original).expect("get").expect("original");
        assert_eq!(original.processed, Some(processed.id));
    }

    #[tokio::test]
    async fn centering_fills_the_label() {
        let rig = rig(false);
        submit(&rig, png(10, 10), &[("x", "50"), ("y", "20"), ("centerh", "")]);
        let (_, _, calls) = finish(rig).await;
        assert_eq!(calls[0], Call::Print(50, 20));
    }

    #[tokio::test]
    async fn zero_page_feeds_skip_the_printer() {
        let rig = rig(false);
        let id = submit(&rig, png(8, 8), &[("x", "8"), ("y", "8"), ("pf", "0")]);
        let (board, _, calls) = finish(rig).await;
        assert!(calls.is_empty());
        assert!(board.latest(&id).is_some_and(|s| s.done && !s.is_error()));
    }

    #[tokio::test]
    async fn upload_failure_fails_only_that_job() {
        let rig = rig(true);
        let first = submit(&rig, png(8, 8), &[("x", "8"), ("y", "8")]);
        let second = submit(&rig, png(8, 8), &[("x", "8"), ("y", "8"), ("pf", "0")]);
        let (board, _, _) = finish(rig).await;

        let failed = board.latest(&first).expect("status");
        assert_eq!(failed.step, "Uploading Data: connection reset");
        assert!(failed.done);
        assert_eq!(failed.progress, -1.0);

        let history = board.history(&first);
        assert_eq!(history[history.len() - 2].step, "printing");

        assert_eq!(board.latest(&second).map(|s| s.progress), Some(1.0));
    }

    #[tokio::test]
    async fn oversized_label_fails_and_the_worker_moves_on() {
        let rig = rig(false);
        let huge = submit(
            &rig,
            png(4, 4),
            &[("x", "2147483647"), ("y", "4096"), ("centerh", ""), ("pf", "0")],
        );
        let next = submit(&rig, png(8, 8), &[("x", "16"), ("y", "8"), ("centerh", "")]);
        let (board, _, calls) = finish(rig).await;

        let failed = board.latest(&huge).expect("status");
        assert!(failed.done);
        assert_eq!(failed.progress, -1.0);
        assert!(failed.step.starts_with("Label Too Large: "), "{}", failed.step);

        assert_eq!(board.latest(&next).map(|s| (s.done, s.progress)), Some((true, 1.0)));
        assert_eq!(calls, vec![Call::Print(16, 8), Call::Feed(1)]);
    }

    #[tokio::test]
    async fn simulated_device_finishes_without_hardware() {
        let board = Arc::new(StatusBoard::new());
        let store = Arc::new(SqliteImageStore::open_in_memory().expect("store"));
        let pipeline = Pipeline::start(
            &settings(2),
            store,
            board.clone(),
            Device::Simulated {
                delay: Duration::from_millis(5),
            },
        );
        let id = pipeline.admission().submit(PrintRequest {
            body: Ok(png(4, 4)),
            params: RequestParams::from_query([("x", "4"), ("y", "4")]),
            filename: Some("dry.png".into()),
        });
        pipeline.shutdown().await.expect("shutdown");
        assert_eq!(board.latest(&id).map(|s| s.done), Some(true));
    }
}
