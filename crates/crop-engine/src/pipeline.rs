//! The sequential crop-export pipeline.
//!
//! One job reads every source frame in order, crops it to the selected
//! rectangle, and writes it to a sink in the same order. Frame order is the
//! pipeline's core guarantee: output frame `k` is always the crop of source
//! frame `k`, with no reordering, duplication, or gaps.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use vcrop_common::error::{CropError, CropResult};
use vcrop_frame_io::archive::{ArchiveSink, ArchiveSource};
use vcrop_frame_io::ffmpeg::{Encoder, FfmpegSink, FfmpegSource};
use vcrop_frame_io::images::ImageDirSink;
use vcrop_frame_io::{FrameSink, FrameSource, OutputFormat};
use vcrop_model::rect::{BoundsPolicy, Rect};

use crate::parity::correct_parity;

/// Transient read failures are retried this many times before the job
/// converts them into a hard I/O error.
const MAX_READ_ATTEMPTS: u32 = 3;

/// A fully specified crop export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rect: Rect,
    pub format: OutputFormat,
    /// Output frame rate override. Defaults to the source rate.
    pub fps_override: Option<f64>,
}

/// Snapshot handed to the progress callback after each written frame.
#[derive(Debug, Clone, Copy)]
pub struct ExportProgress {
    pub frames_done: u64,
    pub frames_total: u64,
}

impl ExportProgress {
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            1.0
        } else {
            self.frames_done as f64 / self.frames_total as f64
        }
    }
}

/// Progress observer. Called from the exporting thread.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Shared cancellation flag, checked once per frame.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What an export run produced.
#[derive(Debug, Clone, Copy)]
pub struct ExportSummary {
    /// The rectangle actually exported, after any parity correction.
    pub rect: Rect,
    pub frames_written: u64,
    /// True when the run stopped early on a cancel request. The sink is
    /// still finalized, so the partial output is a valid file.
    pub cancelled: bool,
}

/// Run `job` end to end: open the source, resolve the crop rectangle,
/// stream every frame through, finalize the sink.
#[instrument(skip_all, fields(input = %job.input.display(), output = %job.output.display()))]
pub fn run_job(
    job: &CropJob,
    progress: Option<&ProgressCallback>,
    cancel: &CancelFlag,
) -> CropResult<ExportSummary> {
    let mut source = open_source(&job.input)?;
    let frame = source.geometry();

    let mut rect = BoundsPolicy::clamp(job.rect, frame).ok_or_else(|| {
        CropError::validation(format!(
            "crop rect {:?} does not fit the {}x{} source",
            job.rect, frame.width, frame.height
        ))
    })?;

    if job.format.requires_even_dimensions() {
        rect = correct_parity(rect, frame);
        // A 1-pixel span at the frame edge has no even size at this origin.
        BoundsPolicy::clamp(rect, frame).ok_or_else(|| {
            CropError::validation(format!(
                "crop rect {:?} cannot be made even-dimensioned for {}",
                job.rect,
                job.format.as_str()
            ))
        })?;
        if rect != job.rect {
            info!(requested = ?job.rect, corrected = ?rect, "adjusted crop to even dimensions");
        }
    }

    let fps = job.fps_override.unwrap_or_else(|| source.fps());
    let out_geometry = vcrop_model::rect::FrameGeometry::new(rect.w, rect.h);

    let mut sink: Box<dyn FrameSink> = match job.format {
        OutputFormat::Mp4H264 => {
            Box::new(FfmpegSink::create(&job.output, Encoder::H264, out_geometry, fps)?)
        }
        OutputFormat::Mjpeg => {
            Box::new(FfmpegSink::create(&job.output, Encoder::Mjpeg, out_geometry, fps)?)
        }
        OutputFormat::FrameArchive => {
            Box::new(ArchiveSink::create(&job.output, out_geometry, fps)?)
        }
        OutputFormat::ImageDir => Box::new(ImageDirSink::create(&job.output, out_geometry)?),
    };

    let summary = export(source.as_mut(), sink.as_mut(), rect, progress, cancel)?;
    info!(
        frames = summary.frames_written,
        cancelled = summary.cancelled,
        "export finished"
    );
    Ok(summary)
}

/// Run `job` on a worker thread. The caller keeps the [`CancelFlag`] and
/// joins the handle for the result.
pub fn run_job_in_background(
    job: CropJob,
    progress: Option<ProgressCallback>,
    cancel: CancelFlag,
) -> thread::JoinHandle<CropResult<ExportSummary>> {
    thread::spawn(move || run_job(&job, progress.as_ref(), &cancel))
}

/// The core frame loop over already-opened endpoints.
pub fn export(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    rect: Rect,
    progress: Option<&ProgressCallback>,
    cancel: &CancelFlag,
) -> CropResult<ExportSummary> {
    let frame = source.geometry();
    if BoundsPolicy::clamp(rect, frame).is_none() {
        return Err(CropError::validation(format!(
            "crop rect {:?} does not fit the {}x{} source",
            rect, frame.width, frame.height
        )));
    }

    let frames_total = source.frame_count();
    let mut frames_written = 0u64;

    for index in 0..frames_total {
        if cancel.is_cancelled() {
            warn!(frames_written, "export cancelled");
            sink.finish()
                .map_err(|e| at_last_written(e, frames_written))?;
            return Ok(ExportSummary {
                rect,
                frames_written,
                cancelled: true,
            });
        }

        let full = read_with_retry(source, index).map_err(|e| at_last_written(e, frames_written))?;
        let cropped = full.crop(&rect)?;
        sink.write(&cropped)
            .map_err(|e| at_last_written(e, frames_written))?;
        frames_written += 1;

        if let Some(callback) = progress {
            callback(ExportProgress {
                frames_done: frames_written,
                frames_total,
            });
        }
    }

    sink.finish()
        .map_err(|e| at_last_written(e, frames_written))?;

    Ok(ExportSummary {
        rect,
        frames_written,
        cancelled: false,
    })
}

/// Read one frame, retrying transient failures a bounded number of times.
fn read_with_retry(source: &mut dyn FrameSource, index: u64) -> CropResult<vcrop_frame_io::Frame> {
    let mut attempt = 1;
    loop {
        match source.read(index) {
            Ok(frame) => return Ok(frame),
            Err(e) if e.is_transient() && attempt < MAX_READ_ATTEMPTS => {
                warn!(index, attempt, error = %e, "transient read failure, retrying");
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                return Err(CropError::io(format!(
                    "frame {index} still failing after {MAX_READ_ATTEMPTS} attempts: {e}"
                )));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Tag an I/O failure with the index of the last successfully written
/// frame. Raw `std::io::Error`s propagated out of a sink or source are
/// folded into the same tagged variant.
fn at_last_written(err: CropError, frames_written: u64) -> CropError {
    if frames_written == 0 {
        return err;
    }
    match err {
        CropError::Io {
            frame_index: None,
            message,
        } => CropError::io_at_frame(frames_written - 1, message),
        CropError::StdIo(e) => CropError::io_at_frame(frames_written - 1, e.to_string()),
        other => other,
    }
}

fn open_source(path: &std::path::Path) -> CropResult<Box<dyn FrameSource>> {
    if path.extension().and_then(|e| e.to_str()) == Some("vcrp") {
        Ok(Box::new(ArchiveSource::open(path)?))
    } else {
        Ok(Box::new(FfmpegSource::open(path)?))
    }
}
