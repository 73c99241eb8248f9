//! Shared geometry types: viewport and bounding box.

use serde::{Deserialize, Serialize};

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Viewport-relative box for an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box with no area carries no positional information.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0 && self.x == 0.0 && self.y == 0.0
    }

    /// Euclidean distance between the top-left corners.
    pub fn origin_distance(&self, other: &BoundingBox) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Shift this box by a delta.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_distance_is_euclidean() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(3.0, 4.0, 10.0, 10.0);
        assert!((a.origin_distance(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn translation_keeps_size() {
        let moved = BoundingBox::new(10.0, 20.0, 100.0, 40.0).translated(5.0, -20.0);
        assert_eq!(moved, BoundingBox::new(15.0, 0.0, 100.0, 40.0));
    }

    #[test]
    fn default_box_is_empty() {
        assert!(BoundingBox::default().is_empty());
        assert!(!BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
