//! ffmpeg/ffprobe subprocess backends.
//!
//! Decoding is a sequential rawvideo rgb24 pipe read from ffmpeg stdout.
//! Random access is emulated on top of it: forward seeks skip frames off the
//! pipe, backward seeks restart the decoder. Encoding pushes rgb24 frames
//! into ffmpeg stdin and lets it mux the container.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;

use tracing::{debug, warn};

use vcrop_common::error::{CropError, CropResult};
use vcrop_model::rect::FrameGeometry;

use crate::{Frame, FrameSink, FrameSource, BYTES_PER_PIXEL};

/// Probed stream properties of a video file.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
    pub frame_count: u64,
}

/// Run ffprobe on `path` and extract the video stream properties.
///
/// Frame count comes from `-count_packets`, which demuxes the whole stream
/// but never decodes it. `nb_frames` alone is absent from many containers.
pub fn probe(path: &Path) -> CropResult<VideoInfo> {
    if !path.exists() {
        return Err(CropError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_read_packets",
            "-print_format",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| CropError::io(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(CropError::io(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let stream = json["streams"]
        .as_array()
        .and_then(|s| s.first())
        .ok_or_else(|| CropError::io(format!("no video stream in {}", path.display())))?;

    let width = stream["width"]
        .as_i64()
        .ok_or_else(|| CropError::io("ffprobe output missing width"))? as i32;
    let height = stream["height"]
        .as_i64()
        .ok_or_else(|| CropError::io("ffprobe output missing height"))? as i32;

    let fps = parse_frame_rate(stream["r_frame_rate"].as_str().unwrap_or(""))
        .ok_or_else(|| CropError::io("ffprobe output missing a usable r_frame_rate"))?;

    let frame_count = stream["nb_read_packets"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| CropError::io("ffprobe output missing nb_read_packets"))?;

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Parse ffprobe's rational frame rate, e.g. `"30/1"` or `"30000/1001"`.
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let n: f64 = num.parse().ok()?;
        let d: f64 = den.parse().ok()?;
        if d > 0.0 && n > 0.0 {
            return Some(n / d);
        }
        return None;
    }
    s.parse::<f64>().ok().filter(|v| *v > 0.0)
}

/// Frame-indexed reader over an ffmpeg rawvideo pipe.
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    decoder: Option<Decoder>,
    /// Pipe position: index of the next frame the decoder will hand over.
    next_index: u64,
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
}

impl FfmpegSource {
    /// Probe `path` and prepare a source. The decoder process starts lazily
    /// on the first read.
    pub fn open(path: impl Into<PathBuf>) -> CropResult<Self> {
        let path = path.into();
        let info = probe(&path)?;
        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            frames = info.frame_count,
            "opened video source"
        );
        Ok(Self {
            path,
            info,
            decoder: None,
            next_index: 0,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_size(&self) -> usize {
        self.info.width as usize * self.info.height as usize * BYTES_PER_PIXEL
    }

    fn spawn_decoder(&self) -> CropResult<Decoder> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CropError::io(format!("failed to spawn ffmpeg decoder: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CropError::io("ffmpeg decoder has no stdout pipe"))?;

        Ok(Decoder { child, stdout })
    }

    /// Position the pipe so the next frame off it is `index`. Backward means
    /// a fresh decoder; forward means draining the frames in between.
    fn seek_to(&mut self, index: u64) -> CropResult<()> {
        if self.decoder.is_none() || index < self.next_index {
            if index < self.next_index {
                debug!(from = self.next_index, to = index, "restarting decoder for backward seek");
            }
            self.shutdown_decoder();
            self.decoder = Some(self.spawn_decoder()?);
            self.next_index = 0;
        }

        let frame_size = self.frame_size();
        let mut skip = vec![0u8; frame_size];
        while self.next_index < index {
            let decoder = self.decoder.as_mut().ok_or_else(|| {
                CropError::state("decoder went away while skipping frames")
            })?;
            decoder
                .stdout
                .read_exact(&mut skip)
                .map_err(|e| decode_read_error(self.next_index, e))?;
            self.next_index += 1;
        }
        Ok(())
    }

    fn shutdown_decoder(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            let _ = decoder.child.kill();
            let _ = decoder.child.wait();
        }
    }
}

fn decode_read_error(index: u64, e: std::io::Error) -> CropError {
    CropError::io(format!("short read from ffmpeg decoder at frame {index}: {e}"))
}

impl FrameSource for FfmpegSource {
    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.info.width, self.info.height)
    }

    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn read(&mut self, index: u64) -> CropResult<Frame> {
        if index >= self.info.frame_count {
            return Err(CropError::validation(format!(
                "frame index {index} out of range (video has {} frames)",
                self.info.frame_count
            )));
        }

        self.seek_to(index)?;

        let mut data = vec![0u8; self.frame_size()];
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| CropError::state("decoder not running"))?;
        decoder
            .stdout
            .read_exact(&mut data)
            .map_err(|e| decode_read_error(index, e))?;
        self.next_index = index + 1;

        Frame::new(self.info.width as u32, self.info.height as u32, data)
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.shutdown_decoder();
    }
}

/// Video container flavor an [`FfmpegSink`] muxes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// H.264 in MP4. Needs even width and height for yuv420p.
    H264,
    /// Motion JPEG in AVI. Any frame size.
    Mjpeg,
}

/// Sequential encoder over an ffmpeg rawvideo stdin pipe.
#[derive(Debug)]
pub struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<thread::JoinHandle<String>>,
    path: PathBuf,
    geometry: FrameGeometry,
    frames_written: u64,
}

impl FfmpegSink {
    pub fn create(
        path: impl Into<PathBuf>,
        encoder: Encoder,
        geometry: FrameGeometry,
        fps: f64,
    ) -> CropResult<Self> {
        let path = path.into();

        if encoder == Encoder::H264 && (geometry.width % 2 != 0 || geometry.height % 2 != 0) {
            return Err(CropError::validation(format!(
                "H.264 output requires even dimensions, got {}x{}",
                geometry.width, geometry.height
            )));
        }
        if fps <= 0.0 {
            return Err(CropError::validation(format!("invalid frame rate: {fps}")));
        }

        let size = format!("{}x{}", geometry.width, geometry.height);
        let fps_arg = format!("{fps}");

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &size, "-r", &fps_arg])
            .args(["-i", "pipe:0"]);

        match encoder {
            Encoder::H264 => {
                cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-preset", "fast"]);
            }
            Encoder::Mjpeg => {
                cmd.args(["-c:v", "mjpeg", "-q:v", "3"]);
            }
        }
        cmd.arg(&path);

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CropError::io(format!("failed to spawn ffmpeg encoder: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CropError::io("ffmpeg encoder has no stdin pipe"))?;

        // Drain stderr on a side thread so a chatty encoder never deadlocks
        // against our frame writes.
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CropError::io("ffmpeg encoder has no stderr pipe"))?;
        let stderr_drain = thread::spawn(move || {
            let mut buf = String::new();
            let mut reader = std::io::BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf);
            buf
        });

        debug!(path = %path.display(), ?encoder, %size, fps, "started ffmpeg encoder");

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            path,
            geometry,
            frames_written: 0,
        })
    }

    fn encoder_failure(&mut self, context: &str) -> CropError {
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let detail = stderr.trim();
        if detail.is_empty() {
            CropError::io(context)
        } else {
            CropError::io(format!("{context}: {detail}"))
        }
    }
}

impl FrameSink for FfmpegSink {
    fn write(&mut self, frame: &Frame) -> CropResult<()> {
        if frame.geometry() != self.geometry {
            return Err(CropError::validation(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.geometry.width,
                self.geometry.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CropError::state("encoder already finished"))?;

        if let Err(e) = stdin.write_all(frame.data()) {
            return Err(self.encoder_failure(&format!("ffmpeg encoder rejected frame: {e}")));
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> CropResult<()> {
        // Closing stdin signals end of stream; ffmpeg then writes the trailer.
        drop(self.stdin.take());

        let mut child = self
            .child
            .take()
            .ok_or_else(|| CropError::state("encoder already finished"))?;
        let status = child
            .wait()
            .map_err(|e| CropError::io(format!("failed to wait for ffmpeg encoder: {e}")))?;

        if !status.success() {
            return Err(self.encoder_failure(&format!("ffmpeg encoder exited with {status}")));
        }

        debug!(path = %self.path.display(), frames = self.frames_written, "finalized encode");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!(path = %self.path.display(), "dropping unfinished encoder, killing ffmpeg");
            drop(self.stdin.take());
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(drain) = self.stderr_drain.take() {
            let _ = drain.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_parsing_handles_rationals() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate(""), None);
    }

    #[test]
    fn probing_a_missing_file_is_file_not_found() {
        let err = probe(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, CropError::FileNotFound { .. }));
    }

    #[test]
    fn odd_dimensions_are_rejected_for_h264() {
        let err = FfmpegSink::create(
            std::env::temp_dir().join("odd.mp4"),
            Encoder::H264,
            FrameGeometry::new(11, 10),
            30.0,
        )
        .unwrap_err();
        assert!(matches!(err, CropError::Validation { .. }));
    }
}
