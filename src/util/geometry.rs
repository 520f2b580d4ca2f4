//! Integer rectangles in layout or surface-local coordinates.

/// Axis-aligned box. Empty when either dimension is not positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Edges saturate at the integer limits; boxes come from clients.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Point test in floating layout coordinates (cursor positions).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        !self.is_empty()
            && x >= self.x as f64
            && x < self.right() as f64
            && y >= self.y as f64
            && y < self.bottom() as f64
    }

    /// Smallest box covering both. Empty boxes are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()).saturating_sub(x),
            height: self.bottom().max(other.bottom()).saturating_sub(y),
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy), ..*self }
    }

    /// Translate, or `None` when the moved box would not fit in `i32`.
    pub fn checked_translate(&self, dx: i32, dy: i32) -> Option<Rect> {
        let moved = Rect { x: self.x.checked_add(dx)?, y: self.y.checked_add(dy)?, ..*self };
        moved.x.checked_add(moved.width)?;
        moved.y.checked_add(moved.height)?;
        Some(moved)
    }

    /// Slide this box into `bounds`, shrinking it when it cannot fit.
    ///
    /// The result always lies fully inside `bounds` unless `bounds` is empty,
    /// in which case the box is returned unchanged.
    pub fn constrain_to(&self, bounds: &Rect) -> Rect {
        if bounds.is_empty() {
            return *self;
        }
        let width = self.width.min(bounds.width);
        let height = self.height.min(bounds.height);
        let x = self.x.clamp(bounds.x, bounds.right().saturating_sub(width).max(bounds.x));
        let y = self.y.clamp(bounds.y, bounds.bottom().saturating_sub(height).max(bounds.y));
        Rect { x, y, width, height }
    }

    /// Nearest point inside the box, for clamping the cursor.
    pub fn closest_point(&self, x: f64, y: f64) -> (f64, f64) {
        let max_x = self.right().saturating_sub(1).max(self.x) as f64;
        let max_y = self.bottom().saturating_sub(1).max(self.y) as f64;
        (x.clamp(self.x as f64, max_x), y.clamp(self.y as f64, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_ignores_empty() {
        let a = Rect::new(0, 0, 100, 50);
        assert_eq!(a.union(&Rect::default()), a);
        assert_eq!(Rect::default().union(&a), a);
        assert_eq!(a.union(&Rect::new(100, 0, 200, 80)), Rect::new(0, 0, 300, 80));
    }

    #[test]
    fn test_constrain_slides_and_shrinks() {
        let bounds = Rect::new(0, 0, 1920, 1080);
        let popup = Rect::new(1850, 1000, 200, 100);
        assert_eq!(popup.constrain_to(&bounds), Rect::new(1720, 980, 200, 100));

        let huge = Rect::new(-50, -50, 4000, 2000);
        assert_eq!(huge.constrain_to(&bounds), bounds);
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = Rect::new(10, 10, 10, 10);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(19.5, 19.5));
        assert!(!r.contains(20.0, 15.0));
    }

    #[test]
    fn test_edges_saturate_at_integer_limits() {
        let r = Rect::new(i32::MAX - 10, 0, 100, 100);
        assert_eq!(r.right(), i32::MAX);
        assert!(!r.contains(0.0, 50.0));
        assert_eq!(r.translate(100, 0).x, i32::MAX);
        assert_eq!(r.checked_translate(1, 0), None);
        assert_eq!(Rect::new(0, 0, 10, 10).checked_translate(5, -5), Some(Rect::new(5, -5, 10, 10)));

        let bounds = Rect::new(i32::MAX - 50, 0, 100, 100);
        let clamped = Rect::new(0, 0, 100, 100).constrain_to(&bounds);
        assert_eq!(clamped.x, bounds.x);
    }
}
