#![forbid(unsafe_code)]

//! Geometric primitives shared by the render pipeline and the backdrop.
//!
//! Coordinates are in CSS-style pixels with the origin at the top-left and
//! y growing downward. The *world* is the full scrollable document strip;
//! the *viewport* is the window currently on screen, offset by `scroll_y`.

/// The on-screen window dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Viewport {
    /// Create a new viewport.
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Area in square pixels.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Check whether the viewport has zero (or negative) area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Number of viewport heights needed to cover `total_height`, rounded
    /// up. Zero-height viewports cover nothing and report zero spans.
    #[inline]
    pub fn spans(&self, total_height: f32) -> u32 {
        if self.height <= 0.0 || total_height <= 0.0 {
            return 0;
        }
        (total_height / self.height).ceil() as u32
    }

    /// The vertical band of world space visible at `scroll_y`, widened by
    /// `margin` on both sides.
    #[inline]
    pub fn visible_band(&self, scroll_y: f32, margin: f32) -> Band {
        Band {
            top: scroll_y - margin,
            bottom: scroll_y + self.height + margin,
        }
    }
}

/// A vertical slice of world space, used for culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Upper edge (inclusive).
    pub top: f32,
    /// Lower edge (inclusive).
    pub bottom: f32,
}

impl Band {
    /// Check whether a world-space y coordinate falls inside the band.
    #[inline]
    pub fn contains(&self, y: f32) -> bool {
        y >= self.top && y <= self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_and_empty() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.area(), 480_000.0);
        assert!(!vp.is_empty());
        assert!(Viewport::new(0.0, 600.0).is_empty());
        assert!(Viewport::new(800.0, 0.0).is_empty());
    }

    #[test]
    fn spans_rounds_up() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.spans(600.0), 1);
        assert_eq!(vp.spans(601.0), 2);
        assert_eq!(vp.spans(1800.0), 3);
        assert_eq!(vp.spans(0.0), 0);
    }

    #[test]
    fn spans_zero_height_viewport() {
        assert_eq!(Viewport::new(800.0, 0.0).spans(5000.0), 0);
    }

    #[test]
    fn band_contains_margin() {
        let vp = Viewport::new(800.0, 600.0);
        let band = vp.visible_band(1000.0, 100.0);
        assert!(band.contains(900.0));
        assert!(band.contains(1700.0));
        assert!(!band.contains(899.9));
        assert!(!band.contains(1700.1));
    }
}
