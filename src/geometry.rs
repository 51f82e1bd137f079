//! Geometric helpers for 3D collision detection and orientation handling.
//!
//! Pure functions over positions and extents: volumes, the distinct
//! orientations of a part, placement bounds and the spacing-aware AABB test
//! that backs the overlap oracle.

use crate::model::{Dimensions, Orientation, Part};
use crate::types::{BoundingBox, EPSILON_GENERAL, Vec3};

/// Volume of a dimension triple.
#[inline]
pub fn volume(dims: &Dimensions) -> f64 {
    dims.volume()
}

/// Lazily yields the distinct orientations a part may be placed in.
///
/// Follows the part's allowed list in order and skips a permutation whose
/// extents equal one already yielded, so a cube yields a single entry.
///
/// # Examples
/// ```
/// use freight_packer::geometry::orientations;
/// use freight_packer::model::Part;
///
/// let cube = Part::new("cube", 5.0, 5.0, 5.0).unwrap();
/// assert_eq!(orientations(&cube).count(), 1);
///
/// let brick = Part::new("brick", 1.0, 2.0, 3.0).unwrap();
/// assert_eq!(orientations(&brick).count(), 6);
/// ```
pub fn orientations(part: &Part) -> impl Iterator<Item = (Orientation, Vec3)> + Clone + '_ {
    let allowed = &part.allowed_orientations;
    let dims = part.dimensions;
    allowed.iter().enumerate().filter_map(move |(i, orientation)| {
        let extents = orientation.apply(&dims);
        let repeated = allowed[..i]
            .iter()
            .any(|earlier| earlier.apply(&dims) == extents);
        (!repeated).then_some((*orientation, extents))
    })
}

/// Axis-aligned bounds of a part anchored at `point` with the given extents.
#[inline]
pub fn bounds_after_placement(point: Vec3, extents: Vec3) -> BoundingBox {
    BoundingBox::from_position_and_extents(point, extents)
}

/// Gap between two intervals on one axis; negative when they overlap.
///
/// # Examples
/// ```
/// use freight_packer::geometry::gap_1d;
///
/// assert_eq!(gap_1d(0.0, 5.0, 6.0, 8.0), 1.0);
/// assert_eq!(gap_1d(0.0, 5.0, 3.0, 8.0), -2.0);
/// ```
#[inline]
pub fn gap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (b1 - a2).max(a1 - b2)
}

/// Checks whether two boxes come closer than `gap` on every axis.
///
/// With `gap == 0.0` this is the plain separating-axis test; boxes that
/// are exactly `gap` apart (or touching, for zero gap) do not collide.
pub fn intersects_with_gap(a: &BoundingBox, b: &BoundingBox, gap: f64) -> bool {
    let too_close =
        |a1: f64, a2: f64, b1: f64, b2: f64| gap_1d(a1, a2, b1, b2) < gap - EPSILON_GENERAL;

    too_close(a.min.x, a.max.x, b.min.x, b.max.x)
        && too_close(a.min.y, a.max.y, b.min.y, b.max.y)
        && too_close(a.min.z, a.max.z, b.min.z, b.max.z)
}

/// Checks whether a candidate box stays inside the padded interior.
#[inline]
pub fn within_interior(candidate: &BoundingBox, interior: &BoundingBox) -> bool {
    candidate.is_within(interior, EPSILON_GENERAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Orientation;

    fn cuboid(x: f64, y: f64, z: f64, w: f64, h: f64, d: f64) -> BoundingBox {
        bounds_after_placement(Vec3::new(x, y, z), Vec3::new(w, h, d))
    }

    #[test]
    fn orientations_deduplicate_square_faces() {
        let slab = Part::new("slab", 4.0, 4.0, 1.0).unwrap();
        let found: Vec<_> = orientations(&slab).collect();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], (Orientation::Whd, Vec3::new(4.0, 4.0, 1.0)));
        assert_eq!(found[1], (Orientation::Wdh, Vec3::new(4.0, 1.0, 4.0)));
        assert_eq!(found[2], (Orientation::Dwh, Vec3::new(1.0, 4.0, 4.0)));
    }

    #[test]
    fn orientations_respect_allowed_set() {
        let part = Part::new("p", 1.0, 2.0, 3.0).unwrap().fixed();
        let found: Vec<_> = orientations(&part).collect();
        assert_eq!(found, vec![(Orientation::Whd, Vec3::new(1.0, 2.0, 3.0))]);

        let upright = Part::new("u", 1.0, 2.0, 3.0).unwrap().upright();
        let found: Vec<_> = orientations(&upright).map(|(o, _)| o).collect();
        assert_eq!(found, vec![Orientation::Whd, Orientation::Dhw]);
    }

    #[test]
    fn orientations_iterator_is_restartable() {
        let part = Part::new("p", 1.0, 2.0, 3.0).unwrap();
        let iter = orientations(&part);
        assert_eq!(iter.clone().count(), iter.count());
    }

    #[test]
    fn volume_of_dimensions() {
        let dims = Dimensions::new(12.0, 8.0, 3.0).unwrap();
        assert_eq!(volume(&dims), 288.0);
    }

    #[test]
    fn overlapping_boxes_collide() {
        let a = cuboid(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let b = cuboid(5.0, 5.0, 5.0, 10.0, 10.0, 10.0);
        assert!(intersects_with_gap(&a, &b, 0.0));
        assert!(intersects_with_gap(&a, &b, 1.0));
    }

    #[test]
    fn touching_boxes_do_not_collide_without_spacing() {
        let a = cuboid(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let b = cuboid(10.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        assert!(!intersects_with_gap(&a, &b, 0.0));
        assert!(intersects_with_gap(&a, &b, 1.0));
    }

    #[test]
    fn boxes_exactly_spacing_apart_do_not_collide() {
        let a = cuboid(2.0, 2.0, 2.0, 18.0, 10.0, 4.0);
        let b = cuboid(21.0, 2.0, 2.0, 3.0, 3.0, 3.0);
        assert!(!intersects_with_gap(&a, &b, 1.0));
        let c = cuboid(20.5, 2.0, 2.0, 3.0, 3.0, 3.0);
        assert!(intersects_with_gap(&a, &c, 1.0));
    }

    #[test]
    fn separation_on_one_axis_is_enough() {
        let a = cuboid(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let b = cuboid(0.0, 0.0, 15.0, 10.0, 10.0, 10.0);
        assert!(!intersects_with_gap(&a, &b, 5.0));
        assert!(intersects_with_gap(&a, &b, 6.0));
    }

    #[test]
    fn interior_containment() {
        let interior = BoundingBox::new(Vec3::splat(2.0), Vec3::new(26.0, 20.0, 14.0));
        assert!(within_interior(&cuboid(2.0, 2.0, 2.0, 24.0, 18.0, 12.0), &interior));
        assert!(!within_interior(&cuboid(1.0, 2.0, 2.0, 4.0, 4.0, 4.0), &interior));
        assert!(!within_interior(&cuboid(2.0, 2.0, 2.0, 24.0, 18.0, 12.5), &interior));
    }
}
