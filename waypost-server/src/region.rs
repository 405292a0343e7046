//! Region arithmetic for `wl_region`
//!
//! A region is stored as the ordered list of add/subtract operations the
//! client issued; queries replay them. This keeps the representation exact
//! without a full rectangle-band algebra, which nothing in the input paths
//! needs.

use crate::geometry::{Point, Rectangle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RectOp {
    Add,
    Subtract,
}

/// An area built from rectangle additions and subtractions
#[derive(Debug, Clone, Default)]
pub struct Region {
    ops: Vec<(RectOp, Rectangle)>,
}

impl Region {
    /// The empty region
    pub fn new() -> Self {
        Self::default()
    }

    /// A region covering everything
    ///
    /// Used for the default input region of a surface.
    pub fn infinite() -> Self {
        Self {
            ops: vec![(
                RectOp::Add,
                Rectangle::new(i32::MIN / 2, i32::MIN / 2, i32::MAX, i32::MAX),
            )],
        }
    }

    /// Add a rectangle to the region
    pub fn add(&mut self, rect: Rectangle) {
        if !rect.is_empty() {
            self.ops.push((RectOp::Add, rect));
        }
    }

    /// Subtract a rectangle from the region
    pub fn subtract(&mut self, rect: Rectangle) {
        if !rect.is_empty() {
            self.ops.push((RectOp::Subtract, rect));
        }
    }

    /// Whether the point is inside the region
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for (op, rect) in &self.ops {
            if rect.contains(p) {
                inside = *op == RectOp::Add;
            }
        }
        inside
    }

    /// Whether the region covers no point at all
    ///
    /// Conservative: a region whose additions were all subtracted again may
    /// still report non-empty.
    pub fn is_empty(&self) -> bool {
        !self.ops.iter().any(|(op, _)| *op == RectOp::Add)
    }

    /// The bounding box of all added rectangles
    pub fn bounding_box(&self) -> Rectangle {
        let mut bounds = Rectangle::default();
        for (op, rect) in &self.ops {
            if *op == RectOp::Add {
                bounds = bounds.merge(rect);
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_subtract() {
        let mut region = Region::new();
        region.add(Rectangle::new(0, 0, 100, 100));
        region.subtract(Rectangle::new(25, 25, 50, 50));
        assert!(region.contains(Point::new(10, 10)));
        assert!(!region.contains(Point::new(50, 50)));
        // re-adding wins over the earlier subtraction
        region.add(Rectangle::new(40, 40, 10, 10));
        assert!(region.contains(Point::new(45, 45)));
    }

    #[test]
    fn infinite_contains_everything() {
        let region = Region::infinite();
        assert!(region.contains(Point::new(0, 0)));
        assert!(region.contains(Point::new(-100000, 100000)));
    }

    #[test]
    fn empty() {
        let mut region = Region::new();
        assert!(region.is_empty());
        assert!(!region.contains(Point::new(0, 0)));
        region.add(Rectangle::new(0, 0, 1, 1));
        assert!(!region.is_empty());
    }
}
