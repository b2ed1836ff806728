//! Numbered-image directory sink.

use std::path::PathBuf;

use image::{ImageBuffer, Rgb};
use tracing::debug;

use vcrop_common::error::{CropError, CropResult};
use vcrop_model::rect::FrameGeometry;

use crate::{Frame, FrameSink};

/// Writes each frame as `frame_000000.jpg`, `frame_000001.jpg`, ... in a
/// directory, creating the directory if needed.
pub struct ImageDirSink {
    dir: PathBuf,
    geometry: FrameGeometry,
    next_index: u64,
    finished: bool,
}

impl ImageDirSink {
    pub fn create(dir: impl Into<PathBuf>, geometry: FrameGeometry) -> CropResult<Self> {
        let dir = dir.into();
        if geometry.width < 1 || geometry.height < 1 {
            return Err(CropError::validation(format!(
                "invalid image size {}x{}",
                geometry.width, geometry.height
            )));
        }
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            geometry,
            next_index: 0,
            finished: false,
        })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.jpg"))
    }
}

impl FrameSink for ImageDirSink {
    fn write(&mut self, frame: &Frame) -> CropResult<()> {
        if self.finished {
            return Err(CropError::state("image directory already finished"));
        }
        if frame.geometry() != self.geometry {
            return Err(CropError::validation(format!(
                "frame is {}x{}, sink expects {}x{}",
                frame.width(),
                frame.height(),
                self.geometry.width,
                self.geometry.height
            )));
        }

        let buffer: ImageBuffer<Rgb<u8>, _> =
            ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                .ok_or_else(|| CropError::state("frame buffer does not match its geometry"))?;

        let path = self.frame_path(self.next_index);
        buffer
            .save(&path)
            .map_err(|e| CropError::io(format!("failed to write {}: {e}", path.display())))?;
        self.next_index += 1;
        Ok(())
    }

    fn finish(&mut self) -> CropResult<()> {
        if self.finished {
            return Err(CropError::state("image directory already finished"));
        }
        self.finished = true;
        debug!(dir = %self.dir.display(), frames = self.next_index, "finished image directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_land_as_sequentially_numbered_jpegs() {
        let dir = std::env::temp_dir().join(format!("vcrop-imgdir-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let mut sink = ImageDirSink::create(&dir, FrameGeometry::new(8, 6)).unwrap();
        sink.write(&Frame::filled(8, 6, [200, 10, 10])).unwrap();
        sink.write(&Frame::filled(8, 6, [10, 200, 10])).unwrap();
        sink.finish().unwrap();

        assert!(dir.join("frame_000000.jpg").exists());
        assert!(dir.join("frame_000001.jpg").exists());
        assert!(!dir.join("frame_000002.jpg").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn wrong_size_frames_are_rejected() {
        let dir = std::env::temp_dir().join(format!("vcrop-imgdir-bad-{}", std::process::id()));
        let mut sink = ImageDirSink::create(&dir, FrameGeometry::new(8, 6)).unwrap();
        assert!(sink.write(&Frame::filled(4, 4, [0, 0, 0])).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
