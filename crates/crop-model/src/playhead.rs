//! Single owner of the playback/scrub position.
//!
//! The scrollbar, the frame-number text field, and the displayed frame are
//! all observers of one canonical frame-changed notification, which removes
//! the scrollbar-to-textbox feedback cycles of ad hoc two-way bindings.

/// Observer invoked with the new frame index after each actual change.
pub type FrameObserver = Box<dyn Fn(u64)>;

/// Clamped, idempotent playback position over `0..frame_count`.
pub struct Playhead {
    frame_count: u64,
    current: u64,
    observers: Vec<FrameObserver>,
}

impl Playhead {
    pub fn new(frame_count: u64) -> Self {
        Self {
            frame_count,
            current: 0,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl Fn(u64) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Seek to `index`, clamped to the valid frame range. Returns whether
    /// the position actually changed; seeking to the current position is a
    /// silent no-op and notifies nobody.
    pub fn seek(&mut self, index: i64) -> bool {
        let last = self.frame_count.saturating_sub(1);
        let target = index.clamp(0, last as i64) as u64;

        if target == self.current {
            return false;
        }

        self.current = target;
        for observer in &self.observers {
            observer(target);
        }
        true
    }

    /// Reset for a newly loaded video.
    pub fn reset(&mut self, frame_count: u64) {
        self.frame_count = frame_count;
        self.current = 0;
    }
}
