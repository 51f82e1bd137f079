//! Common types and traits for 3D geometry.
//!
//! Positions, oriented extents and axis-aligned bounds used by every
//! stage of the packing engine.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for bounds checks, spacing gaps and point deduplication.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in space.
///
/// The x axis carries a part's width, y its height and z its depth
/// under the chosen orientation.
///
/// # Examples
/// ```
/// use freight_packer::types::Vec3;
///
/// let position = Vec3::new(2.0, 2.0, 2.0);
/// let extents = Vec3::new(12.0, 8.0, 3.0);
/// assert_eq!(position + extents, Vec3::new(14.0, 10.0, 5.0));
/// assert_eq!(extents.volume(), 288.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector with the same value on every axis.
    #[inline]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Sum of the components, the "distance" from the origin corner
    /// used to rank candidate anchors.
    #[inline]
    pub fn manhattan(&self) -> f64 {
        self.x + self.y + self.z
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Checks if all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.x > 0.0
            && self.y > 0.0
            && self.z > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
    }

    /// Checks if this vector is less than or equal to `other` on every axis.
    #[inline]
    pub fn le_all(&self, other: &Self, tolerance: f64) -> bool {
        self.x <= other.x + tolerance
            && self.y <= other.y + tolerance
            && self.z <= other.z + tolerance
    }

    /// Checks if two points coincide within a tolerance.
    #[inline]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

/// Trait for objects with 3D dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object as (x, y, z) extents.
    fn extents(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.extents().volume()
    }
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight, `0.0` when unknown.
    fn weight(&self) -> f64;
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + extents)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from position and extents.
    #[inline]
    pub fn from_position_and_extents(position: Vec3, extents: Vec3) -> Self {
        Self {
            min: position,
            max: position + extents,
        }
    }

    /// Smallest box enclosing both boxes.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(&other.min), self.max.max(&other.max))
    }

    /// Checks if this box lies inside `outer` within a tolerance.
    #[inline]
    pub fn is_within(&self, outer: &Self, tolerance: f64) -> bool {
        outer.min.le_all(&self.min, tolerance) && self.max.le_all(&outer.max, tolerance)
    }

    /// Returns the extents (width, height, depth).
    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the enclosed volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.extents().volume()
    }
}

/// Accumulates weighted positions for center of mass calculation.
#[derive(Clone, Debug, Default)]
pub struct CenterOfMassCalculator {
    weighted: Vec3,
    total_weight: f64,
}

impl CenterOfMassCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self {
            weighted: Vec3::zero(),
            total_weight: 0.0,
        }
    }

    /// Adds a weighted point.
    pub fn add_point(&mut self, point: Vec3, weight: f64) {
        self.weighted = self.weighted + point * weight;
        self.total_weight += weight;
    }

    /// Calculates the center of mass.
    ///
    /// # Returns
    /// `Some(center)` for a positive total weight, `None` otherwise
    pub fn compute(&self) -> Option<Vec3> {
        if self.total_weight <= 0.0 {
            None
        } else {
            Some(self.weighted * (1.0 / self.total_weight))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(a.min(&Vec3::new(0.0, 5.0, 1.0)), Vec3::new(0.0, 2.0, 1.0));
        assert_eq!(a.max(&Vec3::new(0.0, 5.0, 1.0)), Vec3::new(1.0, 5.0, 3.0));
        assert_relative_eq!(a.manhattan(), 6.0);
    }

    #[test]
    fn test_vec3_validity() {
        assert!(Vec3::new(1.0, 1.0, 1.0).is_valid_dimension());
        assert!(!Vec3::new(0.0, 1.0, 1.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, f64::NAN, 1.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, 1.0, f64::INFINITY).is_valid_dimension());
    }

    #[test]
    fn test_bounding_box_union_and_volume() {
        let a = BoundingBox::from_position_and_extents(Vec3::zero(), Vec3::splat(10.0));
        let b = BoundingBox::from_position_and_extents(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(10.0));
        let hull = a.union(&b);

        assert_eq!(hull.min, Vec3::zero());
        assert_eq!(hull.max, Vec3::new(20.0, 10.0, 10.0));
        assert_relative_eq!(hull.volume(), 2000.0);
    }

    #[test]
    fn test_bounding_box_containment() {
        let outer = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(8.0));
        let inner = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(8.0));
        let poking = BoundingBox::new(Vec3::splat(2.0), Vec3::new(8.5, 8.0, 8.0));

        assert!(inner.is_within(&outer, EPSILON_GENERAL));
        assert!(!poking.is_within(&outer, EPSILON_GENERAL));
    }

    #[test]
    fn test_center_of_mass_calculator() {
        assert_eq!(Vec3::default(), Vec3::zero());
        assert!(CenterOfMassCalculator::default().compute().is_none());

        let mut calc = CenterOfMassCalculator::new();
        assert!(calc.compute().is_none());

        calc.add_point(Vec3::new(0.0, 0.0, 0.0), 10.0);
        calc.add_point(Vec3::new(10.0, 0.0, 4.0), 10.0);

        let center = calc.compute().unwrap();
        assert_relative_eq!(center.x, 5.0);
        assert_relative_eq!(center.y, 0.0);
        assert_relative_eq!(center.z, 2.0);
    }
}
