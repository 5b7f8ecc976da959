// SPDX-License-Identifier: MPL-2.0
//! Content-mode geometry for frame presentation.
//!
//! The player is render-surface-agnostic: a [`FrameSink`] decides where a
//! composited frame lands inside its drawing bounds. This module is the
//! shared letterboxing math for that decision, so every sink scales and
//! centers the same way.
//!
//! [`FrameSink`]: crate::sink::FrameSink

/// How a frame is mapped into the sink's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// Stretch to fill the bounds exactly, ignoring aspect ratio.
    ScaleToFill,
    /// Scale uniformly so the whole frame is visible, letterboxing the
    /// remainder.
    #[default]
    AspectFit,
    /// Scale uniformly so the bounds are covered, cropping the overflow.
    AspectFill,
}

/// An axis-aligned rectangle in the sink's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// A rectangle at the origin covering `width` by `height`.
    #[must_use]
    pub fn from_extent(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

/// Computes where an `image`-sized frame should be drawn inside `bounds`
/// under the given content mode.
///
/// Uniform modes center the scaled frame; `AspectFit` leaves symmetric
/// letterbox margins while `AspectFill`'s result extends past the bounds
/// on one axis (negative origin) and is expected to be clipped by the
/// sink. A degenerate image with a zero dimension maps to the full
/// bounds.
#[must_use]
pub fn dest_rect(image: (u32, u32), bounds: (f64, f64), mode: ContentMode) -> Rect {
    let (bounds_w, bounds_h) = bounds;
    let (image_w, image_h) = (f64::from(image.0), f64::from(image.1));
    if image_w <= 0.0 || image_h <= 0.0 {
        return Rect::from_extent(bounds_w, bounds_h);
    }

    let scale = match mode {
        ContentMode::ScaleToFill => return Rect::from_extent(bounds_w, bounds_h),
        ContentMode::AspectFit => (bounds_w / image_w).min(bounds_h / image_h),
        ContentMode::AspectFill => (bounds_w / image_w).max(bounds_h / image_h),
    };

    let width = image_w * scale;
    let height = image_h * scale;
    Rect {
        x: (bounds_w - width) / 2.0,
        y: (bounds_h - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rect_eq(actual: Rect, expected: Rect) {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(
            close(actual.x, expected.x)
                && close(actual.y, expected.y)
                && close(actual.width, expected.width)
                && close(actual.height, expected.height),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn scale_to_fill_covers_bounds_exactly() {
        let rect = dest_rect((640, 480), (100.0, 50.0), ContentMode::ScaleToFill);
        assert_rect_eq(rect, Rect::from_extent(100.0, 50.0));
    }

    #[test]
    fn aspect_fit_letterboxes_wide_frame_vertically() {
        // 2:1 frame into a square: full width, centered half height.
        let rect = dest_rect((200, 100), (100.0, 100.0), ContentMode::AspectFit);
        assert_rect_eq(
            rect,
            Rect {
                x: 0.0,
                y: 25.0,
                width: 100.0,
                height: 50.0,
            },
        );
    }

    #[test]
    fn aspect_fit_letterboxes_tall_frame_horizontally() {
        let rect = dest_rect((100, 200), (100.0, 100.0), ContentMode::AspectFit);
        assert_rect_eq(
            rect,
            Rect {
                x: 25.0,
                y: 0.0,
                width: 50.0,
                height: 100.0,
            },
        );
    }

    #[test]
    fn aspect_fill_overflows_the_shorter_axis() {
        // 2:1 frame covering a square crops horizontally.
        let rect = dest_rect((200, 100), (100.0, 100.0), ContentMode::AspectFill);
        assert_rect_eq(
            rect,
            Rect {
                x: -50.0,
                y: 0.0,
                width: 200.0,
                height: 100.0,
            },
        );
    }

    #[test]
    fn matching_aspect_ratio_fills_under_both_uniform_modes() {
        for mode in [ContentMode::AspectFit, ContentMode::AspectFill] {
            let rect = dest_rect((1920, 1080), (192.0, 108.0), mode);
            assert_rect_eq(rect, Rect::from_extent(192.0, 108.0));
        }
    }

    #[test]
    fn zero_sized_image_maps_to_bounds() {
        let rect = dest_rect((0, 1080), (80.0, 60.0), ContentMode::AspectFit);
        assert_rect_eq(rect, Rect::from_extent(80.0, 60.0));
    }
}
