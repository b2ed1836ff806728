//! End-to-end pipeline behavior over in-memory endpoints.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use vcrop_common::error::{CropError, CropResult};
use vcrop_engine::pipeline::{export, run_job, CancelFlag, CropJob, ProgressCallback};
use vcrop_engine::parity::correct_parity;
use vcrop_frame_io::archive::{ArchiveSink, ArchiveSource};
use vcrop_frame_io::memory::{MemorySink, MemorySource};
use vcrop_frame_io::{Frame, FrameSink, FrameSource, OutputFormat};
use vcrop_model::rect::{FrameGeometry, Rect};

fn indexed_source(count: u64) -> MemorySource {
    // 101x101 frames whose red channel carries the frame index.
    MemorySource::indexed(count, 101, 101, 30.0)
}

#[test]
fn every_frame_is_cropped_and_written_in_order() {
    let mut source = indexed_source(10);
    let mut sink = MemorySink::new();
    let rect = Rect::new(5, 5, 20, 15);

    let summary = export(&mut source, &mut sink, rect, None, &CancelFlag::new()).unwrap();

    assert_eq!(summary.frames_written, 10);
    assert!(!summary.cancelled);
    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 10);
    for (i, frame) in sink.frames().iter().enumerate() {
        assert_eq!(frame.width(), 20);
        assert_eq!(frame.height(), 15);
        assert_eq!(frame.data()[0], i as u8);
    }
}

#[test]
fn parity_corrected_rect_grows_the_odd_dimension() {
    let mut source = indexed_source(10);
    let rect = correct_parity(Rect::new(0, 0, 11, 10), source.geometry());
    assert_eq!(rect, Rect::new(0, 0, 12, 10));

    let mut sink = MemorySink::new();
    let summary = export(&mut source, &mut sink, rect, None, &CancelFlag::new()).unwrap();

    assert_eq!(summary.rect, rect);
    assert_eq!(sink.frames()[0].width(), 12);
    assert_eq!(sink.frames()[0].height(), 10);
}

#[test]
fn out_of_frame_rects_are_rejected_before_any_write() {
    let mut source = indexed_source(5);
    let mut sink = MemorySink::new();

    let err = export(
        &mut source,
        &mut sink,
        Rect::new(95, 0, 10, 10),
        None,
        &CancelFlag::new(),
    )
    .unwrap_err();

    assert!(matches!(err, CropError::Validation { .. }));
    assert!(sink.frames().is_empty());
    assert!(!sink.is_finished());
}

#[test]
fn write_failure_reports_the_last_written_frame() {
    let mut source = indexed_source(10);
    let mut sink = MemorySink::new().fail_write_at(5);

    let err = export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        None,
        &CancelFlag::new(),
    )
    .unwrap_err();

    match err {
        CropError::Io { frame_index, .. } => assert_eq!(frame_index, Some(4)),
        other => panic!("expected Io, got {other:?}"),
    }
    assert_eq!(sink.frames().len(), 5);
}

/// A sink whose failure surfaces as a raw `std::io::Error` through `?`,
/// the way the file-backed sinks fail.
struct DiskFailingSink {
    written: u64,
    fail_at: u64,
}

impl FrameSink for DiskFailingSink {
    fn write(&mut self, _frame: &Frame) -> CropResult<()> {
        if self.written == self.fail_at {
            return Err(std::io::Error::other("disk full").into());
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> CropResult<()> {
        Ok(())
    }
}

#[test]
fn raw_io_write_failure_still_reports_the_last_written_frame() {
    let mut source = indexed_source(10);
    let mut sink = DiskFailingSink {
        written: 0,
        fail_at: 5,
    };

    let err = export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        None,
        &CancelFlag::new(),
    )
    .unwrap_err();

    match err {
        CropError::Io {
            frame_index,
            message,
        } => {
            assert_eq!(frame_index, Some(4));
            assert!(message.contains("disk full"));
        }
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn failure_before_the_first_write_carries_no_frame_index() {
    let mut source = indexed_source(10).fail_read_at(0);
    let mut sink = MemorySink::new();

    let err = export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        None,
        &CancelFlag::new(),
    )
    .unwrap_err();

    match err {
        CropError::Io { frame_index, .. } => assert_eq!(frame_index, None),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn transient_read_failures_are_retried() {
    let mut source = indexed_source(10).fail_transiently_at(2, 2);
    let mut sink = MemorySink::new();

    let summary = export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        None,
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(summary.frames_written, 10);
    assert_eq!(sink.frames()[2].data()[0], 2);
}

#[test]
fn persistent_transient_failures_become_hard_errors() {
    let mut source = indexed_source(10).fail_transiently_at(2, 100);
    let mut sink = MemorySink::new();

    let err = export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        None,
        &CancelFlag::new(),
    )
    .unwrap_err();

    match err {
        CropError::Io { frame_index, .. } => assert_eq!(frame_index, Some(1)),
        other => panic!("expected Io, got {other:?}"),
    }
    assert_eq!(sink.frames().len(), 2);
}

#[test]
fn progress_is_reported_once_per_frame() {
    let mut source = indexed_source(7);
    let mut sink = MemorySink::new();

    let calls = Arc::new(AtomicU64::new(0));
    let seen = calls.clone();
    let callback: ProgressCallback = Box::new(move |p| {
        seen.fetch_add(1, Ordering::Relaxed);
        assert_eq!(p.frames_total, 7);
        assert!(p.frames_done >= 1 && p.frames_done <= 7);
    });

    export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        Some(&callback),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 7);
}

#[test]
fn cancellation_stops_the_loop_and_finalizes_the_sink() {
    let mut source = indexed_source(100);
    let mut sink = MemorySink::new();

    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let callback: ProgressCallback = Box::new(move |p| {
        if p.frames_done == 3 {
            trigger.cancel();
        }
    });

    let summary = export(
        &mut source,
        &mut sink,
        Rect::new(0, 0, 10, 10),
        Some(&callback),
        &cancel,
    )
    .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_written, 3);
    assert_eq!(sink.frames().len(), 3);
    assert!(sink.is_finished());
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vcrop-pipeline-{name}-{}.vcrp", std::process::id()))
}

/// Write a small frame archive to use as a real `run_job` input.
fn write_archive(path: &PathBuf, width: i32, height: i32, count: u64) {
    let mut sink = ArchiveSink::create(path, FrameGeometry::new(width, height), 24.0).unwrap();
    for i in 0..count {
        sink.write(&Frame::filled(
            width as u32,
            height as u32,
            [(i % 256) as u8, 0, 0],
        ))
        .unwrap();
    }
    sink.finish().unwrap();
}

#[test]
fn run_job_crops_an_archive_end_to_end() {
    let input = temp_path("job-in");
    let output = temp_path("job-out");
    write_archive(&input, 20, 10, 5);

    let job = CropJob {
        input: input.clone(),
        output: output.clone(),
        rect: Rect::new(2, 1, 10, 8),
        format: OutputFormat::FrameArchive,
        fps_override: None,
    };

    let summary = run_job(&job, None, &CancelFlag::new()).unwrap();
    assert_eq!(summary.frames_written, 5);
    assert_eq!(summary.rect, job.rect);

    let mut result = ArchiveSource::open(&output).unwrap();
    assert_eq!(result.frame_count(), 5);
    assert_eq!(result.geometry(), FrameGeometry::new(10, 8));
    assert_eq!(result.fps(), 24.0);
    for i in 0..5u64 {
        assert_eq!(result.read(i).unwrap().data()[0], i as u8);
    }

    std::fs::remove_file(&input).unwrap();
    std::fs::remove_file(&output).unwrap();
}

#[test]
fn run_job_rejects_an_edge_pinned_span_with_no_even_size() {
    let input = temp_path("parity-in");
    let output = temp_path("parity-out");
    write_archive(&input, 101, 10, 1);

    // A 1-pixel span at the last column: growing leaves the frame and
    // shrinking reaches zero, so there is no even width at this origin.
    let job = CropJob {
        input: input.clone(),
        output: output.clone(),
        rect: Rect::new(100, 0, 1, 10),
        format: OutputFormat::Mp4H264,
        fps_override: None,
    };

    let err = run_job(&job, None, &CancelFlag::new()).unwrap_err();
    assert!(matches!(err, CropError::Validation { .. }));
    // Rejected before the destination was ever opened.
    assert!(!output.exists());

    std::fs::remove_file(&input).unwrap();
}

#[test]
fn a_preset_cancel_flag_writes_nothing() {
    let mut source = indexed_source(10);
    let mut sink = MemorySink::new();

    let cancel = CancelFlag::new();
    cancel.cancel();

    let summary = export(&mut source, &mut sink, Rect::new(0, 0, 10, 10), None, &cancel).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_written, 0);
    assert!(sink.frames().is_empty());
    assert!(sink.is_finished());
}
