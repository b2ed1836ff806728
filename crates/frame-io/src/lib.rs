//! vcrop Frame I/O
//!
//! Decoder and encoder collaborators behind two narrow seams:
//! - **FrameSource:** frame-indexed random-access read of decoded images
//! - **FrameSink:** strictly sequential, order-preserving write of frames
//!
//! Implementations:
//! - ffmpeg/ffprobe subprocess pipes for real video files
//! - a single-file raw frame archive
//! - a directory of numbered images
//! - in-memory doubles with scriptable failures for pipeline tests
//!
//! Frames are packed rgb24. Resource release is RAII: dropping a source or
//! sink tears its process/file down whether or not the job finished.

pub mod archive;
pub mod ffmpeg;
pub mod images;
pub mod memory;

use serde::{Deserialize, Serialize};

use vcrop_common::error::{CropError, CropResult};
use vcrop_model::rect::{FrameGeometry, Rect};

/// Bytes per rgb24 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// A decoded video frame, packed rgb24, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap raw rgb24 bytes, checking the buffer length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> CropResult<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(CropError::validation(format!(
                "frame buffer is {} bytes, expected {} for {}x{} rgb24",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A solid-color frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width as i32, self.height as i32)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Copy out the rectangular region `[y..y+h, x..x+w]` of this frame.
    /// The channel layout passes through untouched.
    pub fn crop(&self, rect: &Rect) -> CropResult<Frame> {
        if vcrop_model::rect::BoundsPolicy::clamp(*rect, self.geometry()).is_none() {
            return Err(CropError::validation(format!(
                "crop rect {:?} does not fit a {}x{} frame",
                rect, self.width, self.height
            )));
        }

        let (x, y) = (rect.x as usize, rect.y as usize);
        let (w, h) = (rect.w as usize, rect.h as usize);
        let src_stride = self.width as usize * BYTES_PER_PIXEL;
        let row_bytes = w * BYTES_PER_PIXEL;

        let mut data = Vec::with_capacity(row_bytes * h);
        for row in y..y + h {
            let start = row * src_stride + x * BYTES_PER_PIXEL;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        Ok(Frame {
            width: w as u32,
            height: h as u32,
            data,
        })
    }
}

/// Frame-indexed read access to a decoded video.
pub trait FrameSource: Send {
    /// Total number of frames.
    fn frame_count(&self) -> u64;

    /// Pixel dimensions of every frame.
    fn geometry(&self) -> FrameGeometry;

    /// Source frame rate.
    fn fps(&self) -> f64;

    /// Read the frame at `index` (`0 <= index < frame_count`).
    fn read(&mut self, index: u64) -> CropResult<Frame>;
}

/// Sequential, order-preserving write of frames.
///
/// `write` must be called in strict source order. `finish` finalizes the
/// container trailer; dropping an unfinished sink releases its resources
/// without finalizing.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Frame) -> CropResult<()>;

    fn finish(&mut self) -> CropResult<()>;
}

/// Supported export formats.
///
/// Mirrors the original tool's table: an H.264 MP4 (even-dimension
/// constrained), motion JPEG, a raw frame archive, and a folder of JPEGs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Mp4H264,
    Mjpeg,
    FrameArchive,
    ImageDir,
}

impl OutputFormat {
    /// Parse a CLI/config format identifier.
    pub fn parse(name: &str) -> CropResult<Self> {
        match name {
            "mp4-h264" => Ok(Self::Mp4H264),
            "mjpeg" => Ok(Self::Mjpeg),
            "archive" => Ok(Self::FrameArchive),
            "image-dir" => Ok(Self::ImageDir),
            other => Err(CropError::validation(format!(
                "unknown output format: {other}. Use: mp4-h264, mjpeg, archive, image-dir"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4H264 => "mp4-h264",
            Self::Mjpeg => "mjpeg",
            Self::FrameArchive => "archive",
            Self::ImageDir => "image-dir",
        }
    }

    /// Whether the target encoder needs macroblock-aligned (even) width and
    /// height. Only the H.264 path does; MJPEG, the archive, and image
    /// folders take any size.
    pub fn requires_even_dimensions(&self) -> bool {
        matches!(self, Self::Mp4H264)
    }
}
