//! vcrop Model — selection geometry and interaction state
//!
//! The pieces that turn raw pointer events into a bounds-respecting crop
//! rectangle:
//! - **Rect / BoundsPolicy:** pixel rectangles and the accept-or-reject
//!   clamp against the frame
//! - **HandleDetector:** classifies a pointer position as interior, one of
//!   eight border handles, or outside
//! - **SelectionController:** the drag/resize/numeric-edit state machine
//! - **Playhead:** single owner of the scrub position
//!
//! This crate is pure computation — no I/O, no rendering dependencies.
//! All inputs are data; all outputs are data.

pub mod handle;
pub mod playhead;
pub mod rect;
pub mod selection;

pub use handle::{Handle, HandleDetector, HitTest};
pub use playhead::Playhead;
pub use rect::{BoundsPolicy, FrameGeometry, Point, Rect};
pub use selection::{Field, PointerEvent, SelectionController, SelectionState};
