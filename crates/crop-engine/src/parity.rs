//! Even-dimension correction for macroblock-constrained encoders.

use vcrop_model::rect::{FrameGeometry, Rect};

/// Adjust `rect` so both dimensions are even, preferring to grow.
///
/// An odd dimension grows by one pixel when the frame has room past the
/// rectangle's far edge, otherwise it shrinks by one. Position never moves,
/// so the top-left corner the user placed is preserved exactly.
pub fn correct_parity(rect: Rect, frame: FrameGeometry) -> Rect {
    let mut out = rect;

    if out.w % 2 != 0 {
        if out.right() < frame.width {
            out.w += 1;
        } else {
            out.w -= 1;
        }
    }
    if out.h % 2 != 0 {
        if out.bottom() < frame.height {
            out.h += 1;
        } else {
            out.h -= 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameGeometry = FrameGeometry {
        width: 101,
        height: 101,
    };

    #[test]
    fn even_rects_pass_through_unchanged() {
        let r = Rect::new(10, 10, 40, 40);
        assert_eq!(correct_parity(r, FRAME), r);
    }

    #[test]
    fn odd_width_grows_when_room_remains() {
        let r = correct_parity(Rect::new(0, 0, 11, 10), FRAME);
        assert_eq!(r, Rect::new(0, 0, 12, 10));
    }

    #[test]
    fn odd_width_shrinks_at_the_frame_edge() {
        let r = correct_parity(Rect::new(90, 0, 11, 10), FRAME);
        assert_eq!(r, Rect::new(90, 0, 10, 10));
    }

    #[test]
    fn both_dimensions_corrected_independently() {
        let r = correct_parity(Rect::new(0, 94, 11, 7), FRAME);
        assert_eq!(r, Rect::new(0, 94, 12, 6));
    }

    #[test]
    fn position_is_never_moved() {
        for (x, y, w, h) in [(0, 0, 1, 1), (50, 50, 51, 51), (20, 90, 33, 11)] {
            let r = correct_parity(Rect::new(x, y, w, h), FRAME);
            assert_eq!((r.x, r.y), (x, y));
            assert_eq!(r.w % 2, 0);
            assert_eq!(r.h % 2, 0);
        }
    }
}
