//! Axis-aligned box dimensions shared by items and containers.
//!
//! Only aggregate quantities matter to the planner: the volume of a box and
//! whether it fits inside another box on each axis. There is no notion of
//! position or orientation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length, width and height of a rectangular box.
///
/// The axes are fixed: an item's length is always compared against the
/// container's length, its width against the width and its height against
/// the height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    #[inline]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Product of all three axes.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Checks whether `self` fits inside `outer` without rotation.
    ///
    /// The comparison is inclusive: a box whose axis equals the outer axis
    /// still fits. NaN on either side never fits.
    #[inline]
    pub fn fits_within(&self, outer: &Self) -> bool {
        self.length <= outer.length && self.width <= outer.width && self.height <= outer.height
    }

    /// Returns the axes as `(name, value)` pairs in fixed order.
    pub fn axes(&self) -> [(&'static str, f64); 3] {
        [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
        ]
    }
}

#[cfg(test)]
impl From<(f64, f64, f64)> for Dimensions {
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_product_of_axes() {
        let dims = Dimensions::new(2.0, 3.0, 4.0);
        assert_eq!(dims.volume(), 24.0);
    }

    #[test]
    fn fits_within_is_inclusive() {
        let outer = Dimensions::new(10.0, 10.0, 10.0);
        assert!(Dimensions::new(10.0, 10.0, 10.0).fits_within(&outer));
        assert!(Dimensions::new(1.0, 10.0, 5.0).fits_within(&outer));
        assert!(!Dimensions::new(11.0, 1.0, 1.0).fits_within(&outer));
    }

    #[test]
    fn fits_within_does_not_rotate() {
        let outer = Dimensions::new(10.0, 2.0, 2.0);
        // Would fit if rotated onto the long axis, but axes are fixed.
        assert!(!Dimensions::new(2.0, 10.0, 2.0).fits_within(&outer));
    }

    #[test]
    fn nan_never_fits() {
        let outer = Dimensions::new(10.0, 10.0, 10.0);
        assert!(!Dimensions::new(f64::NAN, 1.0, 1.0).fits_within(&outer));
    }
}
