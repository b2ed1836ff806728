//! Border handle classification for pointer positions.

use serde::{Deserialize, Serialize};

use crate::rect::{Point, Rect};

/// One of the eight drag grips on a selection rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    /// Whether dragging this handle moves the left edge.
    pub fn adjusts_left(&self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    /// Whether dragging this handle moves the right edge.
    pub fn adjusts_right(&self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    /// Whether dragging this handle moves the top edge.
    pub fn adjusts_top(&self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    /// Whether dragging this handle moves the bottom edge.
    pub fn adjusts_bottom(&self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }
}

/// Result of classifying a pointer position against a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTest {
    /// Strictly more than the tolerance inside all four edges.
    Interior,
    /// Within the tolerance of an edge or corner.
    Grip(Handle),
    /// Neither interior nor near a border.
    Outside,
}

/// Classifies pointer positions as interior, border handle, or outside.
#[derive(Debug, Clone, Copy)]
pub struct HandleDetector {
    tolerance: i32,
}

impl HandleDetector {
    /// Default border hit tolerance in pixels.
    pub const DEFAULT_TOLERANCE: i32 = 10;

    pub fn new(tolerance: i32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> i32 {
        self.tolerance
    }

    /// Classify `pos` against `rect`.
    ///
    /// Edges are tested left, right, top, bottom; on the left and right
    /// edges the corner checks run before the plain-edge fallback, so a
    /// position within tolerance of both an edge and a corner always
    /// resolves to the corner.
    pub fn hit_test(&self, pos: Point, rect: &Rect) -> HitTest {
        let t = self.tolerance;

        if pos.x > rect.x + t
            && pos.x < rect.right() - t
            && pos.y > rect.y + t
            && pos.y < rect.bottom() - t
        {
            return HitTest::Interior;
        }

        if (pos.x - rect.x).abs() < t {
            if (pos.y - rect.y).abs() < t {
                HitTest::Grip(Handle::TopLeft)
            } else if (pos.y - rect.bottom()).abs() < t {
                HitTest::Grip(Handle::BottomLeft)
            } else {
                HitTest::Grip(Handle::Left)
            }
        } else if (pos.x - rect.right()).abs() < t {
            if (pos.y - rect.y).abs() < t {
                HitTest::Grip(Handle::TopRight)
            } else if (pos.y - rect.bottom()).abs() < t {
                HitTest::Grip(Handle::BottomRight)
            } else {
                HitTest::Grip(Handle::Right)
            }
        } else if (pos.y - rect.y).abs() < t {
            HitTest::Grip(Handle::Top)
        } else if (pos.y - rect.bottom()).abs() < t {
            HitTest::Grip(Handle::Bottom)
        } else {
            HitTest::Outside
        }
    }
}

impl Default for HandleDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect::new(50, 50, 100, 80)
    }

    #[test]
    fn deep_inside_is_interior() {
        let d = HandleDetector::default();
        assert_eq!(d.hit_test(Point::new(100, 90), &rect()), HitTest::Interior);
    }

    #[test]
    fn corner_beats_plain_edge() {
        // Within tolerance of both the left edge and the top edge.
        let d = HandleDetector::default();
        assert_eq!(
            d.hit_test(Point::new(55, 55), &rect()),
            HitTest::Grip(Handle::TopLeft)
        );
    }

    #[test]
    fn plain_edges_resolve_away_from_corners() {
        let d = HandleDetector::default();
        assert_eq!(
            d.hit_test(Point::new(52, 90), &rect()),
            HitTest::Grip(Handle::Left)
        );
        assert_eq!(
            d.hit_test(Point::new(148, 90), &rect()),
            HitTest::Grip(Handle::Right)
        );
        assert_eq!(
            d.hit_test(Point::new(100, 52), &rect()),
            HitTest::Grip(Handle::Top)
        );
        assert_eq!(
            d.hit_test(Point::new(100, 128), &rect()),
            HitTest::Grip(Handle::Bottom)
        );
    }

    #[test]
    fn remaining_corners_take_precedence_too() {
        let d = HandleDetector::default();
        assert_eq!(
            d.hit_test(Point::new(145, 55), &rect()),
            HitTest::Grip(Handle::TopRight)
        );
        assert_eq!(
            d.hit_test(Point::new(55, 125), &rect()),
            HitTest::Grip(Handle::BottomLeft)
        );
        assert_eq!(
            d.hit_test(Point::new(145, 125), &rect()),
            HitTest::Grip(Handle::BottomRight)
        );
    }

    #[test]
    fn far_away_is_outside() {
        let d = HandleDetector::default();
        assert_eq!(d.hit_test(Point::new(0, 0), &rect()), HitTest::Outside);
        assert_eq!(d.hit_test(Point::new(190, 190), &rect()), HitTest::Outside);
    }

    #[test]
    fn band_between_interior_and_edge_is_the_edge() {
        // 5 px inside the left edge: not interior (needs > 10), grabs Left.
        let d = HandleDetector::default();
        assert_eq!(
            d.hit_test(Point::new(55, 90), &rect()),
            HitTest::Grip(Handle::Left)
        );
    }
}
