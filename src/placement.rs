//! Placement selection: the best valid (point, orientation) for one part.
//!
//! Every candidate point is paired with every distinct orientation of the
//! part. Pairs that leave the padded interior or come closer than the
//! spacing to a committed part are rejected; the remaining pairs are ranked
//! by [`PlacementScore`]. The selector only chooses, it never commits.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::geometry::{bounds_after_placement, orientations, within_interior};
use crate::ledger::PlacedPartLedger;
use crate::model::{Orientation, PackingBox, Part};
use crate::packer::PackingConfig;
use crate::types::{BoundingBox, Vec3};

/// A chosen anchor and orientation for a part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub orientation: Orientation,
    pub extents: Vec3,
    pub score: PlacementScore,
}

/// Ranking key of a candidate placement. Lower is better.
///
/// Priority: distance from the origin corner (x + y + z), then the empty
/// space left inside the hull of all committed parts plus the candidate,
/// then x, y, z, then the orientation index. All floats are compared with
/// `total_cmp`, making the order total.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementScore {
    pub distance: f64,
    pub leftover: f64,
    pub position: Vec3,
    pub orientation_index: usize,
}

impl PlacementScore {
    fn cmp_total(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.leftover.total_cmp(&other.leftover))
            .then_with(|| self.position.x.total_cmp(&other.position.x))
            .then_with(|| self.position.y.total_cmp(&other.position.y))
            .then_with(|| self.position.z.total_cmp(&other.position.z))
            .then_with(|| self.orientation_index.cmp(&other.orientation_index))
    }
}

impl Eq for PlacementScore {}

impl PartialOrd for PlacementScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlacementScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_total(other)
    }
}

/// Read-only view over one packing run used to pick placements.
pub struct PlacementSelector<'a> {
    interior: BoundingBox,
    ledger: &'a PlacedPartLedger,
    spacing: f64,
    parallel_threshold: usize,
}

impl<'a> PlacementSelector<'a> {
    /// Creates a selector for the given box, ledger and configuration.
    pub fn new(
        container: &PackingBox,
        ledger: &'a PlacedPartLedger,
        config: &PackingConfig,
    ) -> Self {
        Self {
            interior: container.interior(config.padding),
            ledger,
            spacing: config.spacing,
            parallel_threshold: config.parallel_threshold,
        }
    }

    /// Finds the best valid placement, or `None` when the part fits nowhere.
    ///
    /// Large candidate grids are evaluated on the rayon pool; because the
    /// score is a total order, the answer does not depend on the path taken.
    pub fn select(&self, part: &Part, points: &[Vec3]) -> Option<Placement> {
        let candidates: Vec<(Orientation, Vec3)> = orientations(part).collect();
        let work = points.len() * candidates.len();

        if work >= self.parallel_threshold {
            points
                .par_iter()
                .flat_map_iter(|point| {
                    candidates
                        .iter()
                        .filter_map(move |&(o, extents)| self.evaluate(*point, o, extents))
                })
                .min_by_key(|placement| placement.score)
        } else {
            points
                .iter()
                .flat_map(|point| {
                    candidates
                        .iter()
                        .filter_map(move |&(o, extents)| self.evaluate(*point, o, extents))
                })
                .min_by_key(|placement| placement.score)
        }
    }

    fn evaluate(&self, point: Vec3, orientation: Orientation, extents: Vec3) -> Option<Placement> {
        let bounds = bounds_after_placement(point, extents);
        if !within_interior(&bounds, &self.interior) {
            return None;
        }
        if self.ledger.overlaps(point, extents, self.spacing) {
            return None;
        }

        let occupied = self.ledger.occupied_volume() + extents.volume();
        let hull = match self.ledger.hull() {
            Some(hull) => hull.union(&bounds),
            None => bounds,
        };

        Some(Placement {
            position: point,
            orientation,
            extents,
            score: PlacementScore {
                distance: point.manhattan(),
                leftover: (hull.volume() - occupied).max(0.0),
                position: point,
                orientation_index: orientation.index(),
            },
        })
    }
}

/// Checks whether any allowed orientation of the part fits the empty
/// padded interior of the box.
pub fn fits_interior(part: &Part, container: &PackingBox, padding: f64) -> bool {
    let interior = container.interior(padding);
    orientations(part)
        .any(|(_, extents)| within_interior(&bounds_after_placement(interior.min, extents), &interior))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlacedPart;
    use approx::assert_relative_eq;

    fn config(padding: f64, spacing: f64) -> PackingConfig {
        PackingConfig::builder()
            .padding(padding)
            .spacing(spacing)
            .build()
    }

    #[test]
    fn first_part_goes_to_padded_origin_in_first_fitting_orientation() {
        let container = PackingBox::new(28.0, 22.0, 16.0).unwrap();
        let ledger = PlacedPartLedger::new();
        let cfg = config(2.0, 1.0);
        let selector = PlacementSelector::new(&container, &ledger, &cfg);

        let part = Part::new("frame", 18.0, 10.0, 4.0).unwrap();
        let placement = selector.select(&part, &[Vec3::splat(2.0)]).unwrap();

        assert_eq!(placement.position, Vec3::splat(2.0));
        assert_eq!(placement.orientation, Orientation::Whd);
        assert_relative_eq!(placement.score.leftover, 0.0);
    }

    #[test]
    fn rotates_when_only_a_rotation_fits() {
        let container = PackingBox::new(10.0, 30.0, 10.0).unwrap();
        let ledger = PlacedPartLedger::new();
        let cfg = config(0.0, 0.0);
        let selector = PlacementSelector::new(&container, &ledger, &cfg);

        let part = Part::new("rod", 25.0, 5.0, 5.0).unwrap();
        let placement = selector.select(&part, &[Vec3::zero()]).unwrap();
        assert_eq!(placement.extents, Vec3::new(5.0, 25.0, 5.0));
        assert_eq!(placement.orientation, Orientation::Hwd);

        let fixed = part.fixed();
        assert!(selector.select(&fixed, &[Vec3::zero()]).is_none());
    }

    #[test]
    fn prefers_point_closest_to_origin() {
        let container = PackingBox::new(28.0, 22.0, 16.0).unwrap();
        let mut ledger = PlacedPartLedger::new();
        let first = Part::new("frame", 18.0, 10.0, 4.0).unwrap();
        ledger.commit(PlacedPart::new(first, Vec3::splat(2.0), Orientation::Whd));
        let cfg = config(2.0, 1.0);
        let selector = PlacementSelector::new(&container, &ledger, &cfg);

        let points = [
            Vec3::new(21.0, 2.0, 2.0),
            Vec3::new(2.0, 13.0, 2.0),
            Vec3::new(2.0, 2.0, 7.0),
        ];
        let part = Part::new("bracket", 12.0, 8.0, 3.0).unwrap();
        let placement = selector.select(&part, &points).unwrap();

        assert_eq!(placement.position, Vec3::new(2.0, 2.0, 7.0));
        assert_eq!(placement.orientation, Orientation::Whd);
        // hull 18 x 10 x 8 minus 720 + 288 occupied
        assert_relative_eq!(placement.score.leftover, 432.0);
    }

    #[test]
    fn rejects_overlapping_candidates() {
        let container = PackingBox::new(20.0, 20.0, 20.0).unwrap();
        let mut ledger = PlacedPartLedger::new();
        let first = Part::new("a", 11.0, 11.0, 11.0).unwrap();
        ledger.commit(PlacedPart::new(first, Vec3::zero(), Orientation::Whd));
        let cfg = config(0.0, 0.0);
        let selector = PlacementSelector::new(&container, &ledger, &cfg);

        let part = Part::new("b", 11.0, 11.0, 11.0).unwrap();
        let points = [Vec3::zero(), Vec3::new(5.0, 5.0, 5.0)];
        assert!(selector.select(&part, &points).is_none());
    }

    #[test]
    fn leftover_breaks_ties_between_equal_distances() {
        let container = PackingBox::new(20.0, 20.0, 20.0).unwrap();
        let mut ledger = PlacedPartLedger::new();
        let first = Part::new("a", 10.0, 10.0, 10.0).unwrap();
        ledger.commit(PlacedPart::new(first, Vec3::zero(), Orientation::Whd));
        let cfg = config(0.0, 0.0);
        let selector = PlacementSelector::new(&container, &ledger, &cfg);

        // all anchors are 10 away from the origin; only beside the cube on x
        // does the slab extend the hull without leaving a hole
        let slab = Part::new("slab", 5.0, 10.0, 10.0).unwrap().fixed();
        let points = [
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 0.0),
        ];
        let placement = selector.select(&slab, &points).unwrap();

        assert_eq!(placement.position, Vec3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(placement.score.leftover, 0.0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let container = PackingBox::new(40.0, 40.0, 40.0).unwrap();
        let mut ledger = PlacedPartLedger::new();
        let first = Part::new("a", 7.0, 9.0, 4.0).unwrap();
        ledger.commit(PlacedPart::new(first, Vec3::splat(1.0), Orientation::Whd));

        let points: Vec<Vec3> = (0..12)
            .map(|i| Vec3::new(1.0 + (i % 4) as f64 * 9.0, 1.0 + (i / 4) as f64 * 11.0, 6.0))
            .collect();
        let part = Part::new("b", 3.0, 5.0, 8.0).unwrap();

        let sequential = PackingConfig::builder()
            .padding(1.0)
            .spacing(1.0)
            .parallel_threshold(usize::MAX)
            .build();
        let parallel = PackingConfig::builder()
            .padding(1.0)
            .spacing(1.0)
            .parallel_threshold(0)
            .build();

        let a = PlacementSelector::new(&container, &ledger, &sequential).select(&part, &points);
        let b = PlacementSelector::new(&container, &ledger, &parallel).select(&part, &points);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn interior_fit_check() {
        let container = PackingBox::new(10.0, 10.0, 10.0).unwrap();
        let big = Part::new("big", 20.0, 20.0, 20.0).unwrap();
        let tall = Part::new("tall", 2.0, 2.0, 6.0).unwrap();
        assert!(!fits_interior(&big, &container, 2.0));
        assert!(fits_interior(&tall, &container, 2.0));
        assert!(!fits_interior(&tall, &container, 2.5));
    }
}
