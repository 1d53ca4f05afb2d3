use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle `(left, top, right, bottom)`.
///
/// Detectors may report coordinates slightly outside the page, so the fields
/// are signed and only [`BoundingBox::clamp`] brings them into image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn center_x(&self) -> f64 {
        (f64::from(self.left) + f64::from(self.right)) / 2.0
    }

    /// True when the box encloses no pixels.
    pub fn is_degenerate(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Clamps every coordinate into `[0, width] x [0, height]`.
    pub fn clamp(&self, width: u32, height: u32) -> Self {
        let max_x = i32::try_from(width).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            left: self.left.clamp(0, max_x),
            top: self.top.clamp(0, max_y),
            right: self.right.clamp(0, max_x),
            bottom: self.bottom.clamp(0, max_y),
        }
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([left, top, right, bottom]: [i32; 4]) -> Self {
        Self::new(left, top, right, bottom)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[derive(Debug, Clone)]
pub struct TextRegion {
    pub text: String,
    pub bounding_box: Option<BoundingBox>,
    pub confidence: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_into_image() {
        let bbox = BoundingBox::new(-5, -10, 120, 90).clamp(100, 80);
        assert_eq!(bbox, BoundingBox::new(0, 0, 100, 80));
    }

    #[test]
    fn test_degenerate_after_clamp() {
        let outside = BoundingBox::new(150, 10, 200, 20).clamp(100, 100);
        assert!(outside.is_degenerate());
        assert!(!BoundingBox::new(0, 0, 1, 1).is_degenerate());
    }

    #[test]
    fn test_extreme_coordinates_saturate() {
        let bbox = BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(bbox.width(), i32::MAX);
        assert_eq!(bbox.height(), i32::MAX);
        assert_eq!(bbox.center_x(), -0.5);
    }

    #[test]
    fn test_derived_geometry() {
        let bbox = BoundingBox::from([10, 20, 50, 60]);
        assert_eq!(bbox.width(), 40);
        assert_eq!(bbox.height(), 40);
        assert_eq!(bbox.center_x(), 30.0);
    }
}
