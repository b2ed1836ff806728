//! Single-file raw frame archive.
//!
//! Layout: `VCRP` magic, a little-endian u32 header length, a JSON header
//! with the stream properties, then contiguous rgb24 frames. Fixed frame
//! size makes the file seekable by index, so [`ArchiveSource`] is the one
//! backend with true random access.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use vcrop_common::error::{CropError, CropResult};
use vcrop_model::rect::FrameGeometry;

use crate::{Frame, FrameSink, FrameSource, BYTES_PER_PIXEL};

const MAGIC: &[u8; 4] = b"VCRP";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchiveHeader {
    width: u32,
    height: u32,
    fps: f64,
}

/// Reader over a frame archive file.
pub struct ArchiveSource {
    reader: BufReader<File>,
    header: ArchiveHeader,
    data_start: u64,
    frame_count: u64,
}

impl ArchiveSource {
    pub fn open(path: impl Into<PathBuf>) -> CropResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(CropError::FileNotFound { path });
        }

        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CropError::io(format!(
                "{} is not a frame archive (bad magic)",
                path.display()
            )));
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;

        let mut header_bytes = vec![0u8; header_len];
        reader.read_exact(&mut header_bytes)?;
        let header: ArchiveHeader = serde_json::from_slice(&header_bytes)?;

        if header.width == 0 || header.height == 0 || header.fps <= 0.0 {
            return Err(CropError::io(format!(
                "frame archive {} has a corrupt header",
                path.display()
            )));
        }

        let data_start = (8 + header_len) as u64;
        let frame_size =
            header.width as u64 * header.height as u64 * BYTES_PER_PIXEL as u64;
        let data_len = file_len.saturating_sub(data_start);
        if data_len % frame_size != 0 {
            return Err(CropError::io(format!(
                "frame archive {} is truncated mid-frame",
                path.display()
            )));
        }
        let frame_count = data_len / frame_size;

        debug!(path = %path.display(), frames = frame_count, "opened frame archive");

        Ok(Self {
            reader,
            header,
            data_start,
            frame_count,
        })
    }

    fn frame_size(&self) -> u64 {
        self.header.width as u64 * self.header.height as u64 * BYTES_PER_PIXEL as u64
    }
}

impl FrameSource for ArchiveSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.header.width as i32, self.header.height as i32)
    }

    fn fps(&self) -> f64 {
        self.header.fps
    }

    fn read(&mut self, index: u64) -> CropResult<Frame> {
        if index >= self.frame_count {
            return Err(CropError::validation(format!(
                "frame index {index} out of range (archive has {} frames)",
                self.frame_count
            )));
        }

        let offset = self.data_start + index * self.frame_size();
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut data = vec![0u8; self.frame_size() as usize];
        self.reader
            .read_exact(&mut data)
            .map_err(|e| CropError::io(format!("short archive read at frame {index}: {e}")))?;

        Frame::new(self.header.width, self.header.height, data)
    }
}

/// Sequential writer producing a frame archive file.
pub struct ArchiveSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    geometry: FrameGeometry,
    frames_written: u64,
}

impl ArchiveSink {
    pub fn create(
        path: impl Into<PathBuf>,
        geometry: FrameGeometry,
        fps: f64,
    ) -> CropResult<Self> {
        let path = path.into();
        if geometry.width < 1 || geometry.height < 1 {
            return Err(CropError::validation(format!(
                "invalid archive frame size {}x{}",
                geometry.width, geometry.height
            )));
        }
        if fps <= 0.0 {
            return Err(CropError::validation(format!("invalid frame rate: {fps}")));
        }

        let header = ArchiveHeader {
            width: geometry.width as u32,
            height: geometry.height as u32,
            fps,
        };
        let header_bytes = serde_json::to_vec(&header)?;

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
        writer.write_all(&header_bytes)?;

        Ok(Self {
            writer: Some(writer),
            path,
            geometry,
            frames_written: 0,
        })
    }
}

impl FrameSink for ArchiveSink {
    fn write(&mut self, frame: &Frame) -> CropResult<()> {
        if frame.geometry() != self.geometry {
            return Err(CropError::validation(format!(
                "frame is {}x{}, archive expects {}x{}",
                frame.width(),
                frame.height(),
                self.geometry.width,
                self.geometry.height
            )));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CropError::state("archive already finished"))?;
        writer.write_all(frame.data())?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> CropResult<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| CropError::state("archive already finished"))?;
        writer.flush()?;
        debug!(path = %self.path.display(), frames = self.frames_written, "finalized frame archive");
        Ok(())
    }
}
