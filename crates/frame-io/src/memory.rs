//! In-memory sources and sinks with scriptable failures.
//!
//! These back the pipeline tests: a [`MemorySource`] can be told to fail a
//! given read hard or transiently a bounded number of times, and a
//! [`MemorySink`] records everything written plus whether it was finalized.

use vcrop_common::error::{CropError, CropResult};
use vcrop_model::rect::FrameGeometry;

use crate::{Frame, FrameSink, FrameSource};

/// A fully materialized source over a vector of frames.
pub struct MemorySource {
    frames: Vec<Frame>,
    fps: f64,
    fail_read_at: Option<u64>,
    transient_failures: Option<(u64, u32)>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            fail_read_at: None,
            transient_failures: None,
        }
    }

    /// A source of `count` solid frames with the red channel set to the
    /// frame index, so tests can tell frames apart after cropping.
    pub fn indexed(count: u64, width: u32, height: u32, fps: f64) -> Self {
        let frames = (0..count)
            .map(|i| Frame::filled(width, height, [(i % 256) as u8, 0, 0]))
            .collect();
        Self::new(frames, fps)
    }

    /// Every read of `index` fails hard with an I/O error.
    pub fn fail_read_at(mut self, index: u64) -> Self {
        self.fail_read_at = Some(index);
        self
    }

    /// The first `times` reads of `index` fail with a transient error, then
    /// reads succeed.
    pub fn fail_transiently_at(mut self, index: u64, times: u32) -> Self {
        self.transient_failures = Some((index, times));
        self
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn geometry(&self) -> FrameGeometry {
        self.frames
            .first()
            .map(|f| f.geometry())
            .unwrap_or(FrameGeometry::new(0, 0))
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn read(&mut self, index: u64) -> CropResult<Frame> {
        if self.fail_read_at == Some(index) {
            return Err(CropError::io(format!("scripted read failure at {index}")));
        }
        if let Some((at, times)) = self.transient_failures {
            if at == index && times > 0 {
                self.transient_failures = Some((at, times - 1));
                return Err(CropError::transient(format!(
                    "scripted transient failure at {index}"
                )));
            }
        }
        self.frames
            .get(index as usize)
            .cloned()
            .ok_or_else(|| {
                CropError::validation(format!(
                    "frame index {index} out of range ({} frames)",
                    self.frames.len()
                ))
            })
    }
}

/// A sink that records what was written to it.
pub struct MemorySink {
    frames: Vec<Frame>,
    finished: bool,
    fail_write_at: Option<u64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            finished: false,
            fail_write_at: None,
        }
    }

    /// The write of the `index`-th frame fails hard.
    pub fn fail_write_at(mut self, index: u64) -> Self {
        self.fail_write_at = Some(index);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &Frame) -> CropResult<()> {
        if self.finished {
            return Err(CropError::state("sink already finished"));
        }
        if self.fail_write_at == Some(self.frames.len() as u64) {
            return Err(CropError::io(format!(
                "scripted write failure at {}",
                self.frames.len()
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> CropResult<()> {
        if self.finished {
            return Err(CropError::state("sink already finished"));
        }
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_clear_after_the_scripted_count() {
        let mut source = MemorySource::indexed(3, 4, 4, 30.0).fail_transiently_at(1, 2);
        assert!(source.read(0).is_ok());
        assert!(source.read(1).unwrap_err().is_transient());
        assert!(source.read(1).unwrap_err().is_transient());
        assert!(source.read(1).is_ok());
    }

    #[test]
    fn sink_refuses_writes_after_finish() {
        let mut sink = MemorySink::new();
        sink.write(&Frame::filled(2, 2, [0, 0, 0])).unwrap();
        sink.finish().unwrap();
        assert!(sink.write(&Frame::filled(2, 2, [0, 0, 0])).is_err());
        assert!(sink.is_finished());
    }
}
