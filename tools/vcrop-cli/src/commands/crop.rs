//! Export a cropped region of a video.

use std::path::PathBuf;

use vcrop_common::config::AppConfig;
use vcrop_engine::pipeline::{run_job, CancelFlag, CropJob, ExportProgress, ProgressCallback};
use vcrop_frame_io::OutputFormat;
use vcrop_model::rect::Rect;

#[allow(clippy::too_many_arguments)]
pub fn run(
    config: &AppConfig,
    input: PathBuf,
    output: PathBuf,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    format: Option<String>,
    fps: Option<f64>,
) -> anyhow::Result<()> {
    let format_name = format.unwrap_or_else(|| config.export.format.clone());
    let format = OutputFormat::parse(&format_name)?;
    let fps_override = fps.or(config.export.fps_override);

    let job = CropJob {
        input,
        output: output.clone(),
        rect: Rect::new(x, y, width, height),
        format,
        fps_override,
    };

    println!("Cropping: {}", job.input.display());
    println!("  Region: {}x{} at ({x}, {y})", width, height);
    println!("  Output: {} ({})", output.display(), format.as_str());

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames)  ",
            p.fraction() * 100.0,
            p.frames_done,
            p.frames_total,
        );
    });

    let summary = run_job(&job, Some(&progress_cb), &CancelFlag::new())
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    if summary.rect != job.rect {
        println!(
            "\n  Note: region adjusted to {}x{} at ({}, {}) for {}",
            summary.rect.w,
            summary.rect.h,
            summary.rect.x,
            summary.rect.y,
            format.as_str()
        );
    }
    println!("\nExport complete: {} ({} frames)", output.display(), summary.frames_written);

    Ok(())
}
