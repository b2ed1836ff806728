//! Pixel rectangles and the bounds policy.
//!
//! All coordinates are integer pixels with a top-left origin.

use serde::{Deserialize, Serialize};

/// A 2D pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle, top-left origin, `w,h >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// The normalized rectangle spanning two corner points, in either
    /// order. Width and height are the absolute spans, floored at one
    /// pixel so the result is never degenerate.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (a.x - b.x).abs().max(1),
            h: (a.y - b.y).abs().max(1),
        }
    }

    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// This rectangle shifted by `(dx, dy)`, size unchanged.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Pixel dimensions of the loaded video.
///
/// Immutable for the lifetime of one loaded video; replaced wholesale when
/// a new video is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: i32,
    pub height: i32,
}

impl FrameGeometry {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether a pixel position lies inside the frame.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }
}

/// Validity rules for a rectangle against a frame.
///
/// The policy is strict accept-or-reject: a candidate either already
/// satisfies the invariant (`x>=0, y>=0, w>=1, h>=1, x+w<=width,
/// y+h<=height`) and is returned unchanged, or the mutation is discarded
/// and the caller keeps its prior rectangle. There is no best-effort
/// re-clamp, so an interactive edit can never silently land on a different
/// rectangle than the one being dragged toward.
pub struct BoundsPolicy;

impl BoundsPolicy {
    /// Accept `rect` against `frame`, or reject with `None`.
    pub fn clamp(rect: Rect, frame: FrameGeometry) -> Option<Rect> {
        if rect.x >= 0
            && rect.y >= 0
            && rect.w >= 1
            && rect.h >= 1
            && rect.right() <= frame.width
            && rect.bottom() <= frame.height
        {
            Some(rect)
        } else {
            None
        }
    }
}
