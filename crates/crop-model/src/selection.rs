//! The interactive selection state machine.
//!
//! `SelectionController` owns the live crop rectangle and consumes
//! pointer-down/move/up events and numeric-field edits. Every accepted
//! mutation goes through the same clamp-and-commit path and emits one
//! rect-changed notification; the numeric panel and the drawn overlay are
//! both downstream observers of that single notification, so there is no
//! two-way signal wiring to loop.
//!
//! Events are delivered one at a time and handled to completion; no method
//! here blocks.

use vcrop_common::error::{CropError, CropResult};

use crate::handle::{Handle, HandleDetector, HitTest};
use crate::rect::{BoundsPolicy, FrameGeometry, Point, Rect};

/// A pointer event in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
}

/// A numeric-entry field mirroring one rect dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    Width,
    Height,
}

/// Interaction state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No selection exists.
    Empty,
    /// Dragging out the initial rectangle.
    Drawing,
    /// A selection exists and no drag is active.
    Idle,
    /// Dragging the rectangle interior.
    Moving,
    /// Dragging one of the eight handles.
    Resizing(Handle),
}

/// Observer invoked with the new rect after each accepted mutation.
pub type RectObserver = Box<dyn Fn(Rect)>;

/// Owns the selection rectangle and turns raw events into bounded,
/// geometrically consistent mutations.
pub struct SelectionController {
    frame: Option<FrameGeometry>,
    state: SelectionState,
    rect: Option<Rect>,
    /// Anchor corner while drawing.
    origin: Option<Point>,
    /// Previous pointer position while a drag is active.
    last_pos: Option<Point>,
    detector: HandleDetector,
    observers: Vec<RectObserver>,
}

impl SelectionController {
    pub fn new(detector: HandleDetector) -> Self {
        Self {
            frame: None,
            state: SelectionState::Empty,
            rect: None,
            origin: None,
            last_pos: None,
            detector,
            observers: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(HandleDetector::default())
    }

    /// Register an observer for rect-changed notifications.
    pub fn subscribe(&mut self, observer: impl Fn(Rect) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn frame(&self) -> Option<FrameGeometry> {
        self.frame
    }

    /// Replace the frame geometry for a newly loaded video. The active
    /// selection is discarded; it was sized against the old frame.
    pub fn load_frame(&mut self, frame: FrameGeometry) {
        self.frame = Some(frame);
        self.clear();
    }

    /// Discard the selection and return to `Empty`.
    pub fn clear(&mut self) {
        self.state = SelectionState::Empty;
        self.rect = None;
        self.origin = None;
        self.last_pos = None;
    }

    /// Feed one pointer event through the state machine.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(pos) => self.pointer_down(pos),
            PointerEvent::Move(pos) => self.pointer_move(pos),
            PointerEvent::Up => self.pointer_up(),
        }
    }

    fn pointer_down(&mut self, pos: Point) {
        let Some(frame) = self.frame else {
            return;
        };

        match self.state {
            SelectionState::Empty => {
                if !frame.contains(pos) {
                    return;
                }
                // The smallest legal rect at the click point; the spanned
                // rectangle takes over on the first move.
                if self.try_commit(Rect::new(pos.x, pos.y, 1, 1)) {
                    self.state = SelectionState::Drawing;
                    self.origin = Some(pos);
                    self.last_pos = Some(pos);
                }
            }
            SelectionState::Idle => {
                let Some(rect) = self.rect else {
                    return;
                };
                match self.detector.hit_test(pos, &rect) {
                    HitTest::Interior => {
                        self.state = SelectionState::Moving;
                        self.last_pos = Some(pos);
                    }
                    HitTest::Grip(handle) => {
                        self.state = SelectionState::Resizing(handle);
                        self.last_pos = Some(pos);
                    }
                    // Once a selection exists only handle/interior drags
                    // mutate it; a click elsewhere does not restart.
                    HitTest::Outside => {}
                }
            }
            _ => {}
        }
    }

    fn pointer_move(&mut self, pos: Point) {
        let (dx, dy) = match self.last_pos {
            Some(last) => (pos.x - last.x, pos.y - last.y),
            None => (0, 0),
        };

        match self.state {
            SelectionState::Drawing => {
                if let Some(origin) = self.origin {
                    self.try_commit(Rect::from_corners(origin, pos));
                }
            }
            SelectionState::Moving => {
                if let Some(rect) = self.rect {
                    // Rejected deltas are skipped without aborting the drag.
                    self.try_commit(rect.translated(dx, dy));
                }
            }
            SelectionState::Resizing(handle) => {
                if let Some(rect) = self.rect {
                    self.try_commit(resize_by(rect, handle, dx, dy));
                }
            }
            SelectionState::Empty | SelectionState::Idle => return,
        }

        self.last_pos = Some(pos);
    }

    fn pointer_up(&mut self) {
        match self.state {
            SelectionState::Drawing | SelectionState::Moving | SelectionState::Resizing(_) => {
                self.state = SelectionState::Idle;
                self.origin = None;
                self.last_pos = None;
            }
            SelectionState::Empty | SelectionState::Idle => {}
        }
    }

    /// Apply a numeric-field edit to the active selection.
    ///
    /// Routed through the same clamp-and-commit path as a drag. Writing the
    /// value a field already holds is a silent no-op (`Ok(false)`), so the
    /// mirroring display cannot feed back into itself. A value the bounds
    /// policy rejects leaves the rect untouched and surfaces a validation
    /// error.
    pub fn edit_field(&mut self, field: Field, value: i32) -> CropResult<bool> {
        let frame = self
            .frame
            .ok_or_else(|| CropError::state("no video loaded"))?;
        let rect = self
            .rect
            .ok_or_else(|| CropError::state("no active selection to edit"))?;

        let candidate = match field {
            Field::X => Rect { x: value, ..rect },
            Field::Y => Rect { y: value, ..rect },
            Field::Width => Rect { w: value, ..rect },
            Field::Height => Rect { h: value, ..rect },
        };

        if candidate == rect {
            return Ok(false);
        }

        match BoundsPolicy::clamp(candidate, frame) {
            Some(accepted) => {
                self.commit(accepted);
                Ok(true)
            }
            None => Err(CropError::validation(format!(
                "edit would leave {}x{} frame bounds: {:?}",
                frame.width, frame.height, candidate
            ))),
        }
    }

    /// Clamp a candidate and commit it if accepted. Returns whether the
    /// rect changed.
    fn try_commit(&mut self, candidate: Rect) -> bool {
        let Some(frame) = self.frame else {
            return false;
        };
        match BoundsPolicy::clamp(candidate, frame) {
            Some(accepted) if self.rect != Some(accepted) => {
                self.commit(accepted);
                true
            }
            _ => false,
        }
    }

    fn commit(&mut self, rect: Rect) {
        self.rect = Some(rect);
        for observer in &self.observers {
            observer(rect);
        }
    }
}

/// Additive edge adjustment for a resize drag: each side named by the
/// handle moves by the pointer delta, composite handles move both.
fn resize_by(rect: Rect, handle: Handle, dx: i32, dy: i32) -> Rect {
    let mut r = rect;
    if handle.adjusts_left() {
        r.x += dx;
        r.w -= dx;
    }
    if handle.adjusts_right() {
        r.w += dx;
    }
    if handle.adjusts_top() {
        r.y += dy;
        r.h -= dy;
    }
    if handle.adjusts_bottom() {
        r.h += dy;
    }
    r
}
