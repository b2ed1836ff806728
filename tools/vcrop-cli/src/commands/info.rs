//! Show video stream information.

use std::path::PathBuf;

use vcrop_frame_io::archive::ArchiveSource;
use vcrop_frame_io::ffmpeg;
use vcrop_frame_io::FrameSource;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let (width, height, fps, frame_count) =
        if path.extension().and_then(|e| e.to_str()) == Some("vcrp") {
            let source = ArchiveSource::open(&path)
                .map_err(|e| anyhow::anyhow!("Failed to open archive: {e}"))?;
            let g = source.geometry();
            (g.width, g.height, source.fps(), source.frame_count())
        } else {
            let info =
                ffmpeg::probe(&path).map_err(|e| anyhow::anyhow!("Failed to probe video: {e}"))?;
            (info.width, info.height, info.fps, info.frame_count)
        };

    println!("Video: {}", path.display());
    println!("  Resolution: {width}x{height}");
    println!("  Frame rate: {fps:.3} fps");
    println!("  Frames: {frame_count}");
    if fps > 0.0 {
        println!("  Duration: {:.2}s", frame_count as f64 / fps);
    }

    Ok(())
}
