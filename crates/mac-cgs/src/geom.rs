//! Geometry primitives shared by the query surface.

#[cfg(target_os = "macos")]
use core_graphics::geometry::CGRect;

/// Screen-space rectangle in global coordinates (points, f64 like
/// CoreGraphics).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Horizontal origin.
    pub x: f64,
    /// Vertical origin.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Construct from origin and size.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Left edge.
    #[inline]
    #[must_use]
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Right edge.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge (origin side).
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y
    }

    /// Top edge.
    #[inline]
    #[must_use]
    pub fn top(&self) -> f64 {
        self.y + self.h
    }

    /// Horizontal center.
    #[inline]
    #[must_use]
    pub fn cx(&self) -> f64 {
        self.x + self.w / 2.0
    }

    /// Vertical center.
    #[inline]
    #[must_use]
    pub fn cy(&self) -> f64 {
        self.y + self.h / 2.0
    }

    /// True for a zero-area rectangle.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w == 0.0 || self.h == 0.0
    }
}

#[cfg(target_os = "macos")]
impl From<CGRect> for Rect {
    fn from(r: CGRect) -> Self {
        Self {
            x: r.origin.x,
            y: r.origin.y,
            w: r.size.width,
            h: r.size.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges_and_center() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 20.0);
        assert_eq!(r.top(), 60.0);
        assert_eq!(r.cx(), 25.0);
        assert_eq!(r.cy(), 40.0);
    }

    #[test]
    fn empty_rects() {
        assert!(Rect::default().is_empty());
        assert!(Rect::new(5.0, 5.0, 0.0, 10.0).is_empty());
        assert!(!Rect::new(5.0, 5.0, 1.0, 1.0).is_empty());
    }
}
