//! Placed-part ledger: the authoritative overlap oracle.
//!
//! `spacing` is treated as the full minimum separation between two parts,
//! so a candidate exactly `spacing` away from a committed part is legal.

use crate::geometry::{bounds_after_placement, intersects_with_gap};
use crate::model::PlacedPart;
use crate::types::{BoundingBox, Vec3};

/// Parts committed during one packing run, in commit order.
#[derive(Clone, Debug, Default)]
pub struct PlacedPartLedger {
    placed: Vec<PlacedPart>,
    hull: Option<BoundingBox>,
    occupied_volume: f64,
}

impl PlacedPartLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether a candidate anchored at `min` comes closer than
    /// `spacing` to any committed part on all three axes at once.
    pub fn overlaps(&self, min: Vec3, extents: Vec3, spacing: f64) -> bool {
        let candidate = bounds_after_placement(min, extents);
        self.placed
            .iter()
            .any(|p| intersects_with_gap(&p.bounding_box(), &candidate, spacing))
    }

    /// Appends a placed part. There is no way to remove it again.
    pub fn commit(&mut self, placed: PlacedPart) {
        let bounds = placed.bounding_box();
        self.hull = Some(match self.hull {
            Some(hull) => hull.union(&bounds),
            None => bounds,
        });
        self.occupied_volume += placed.extents.volume();
        self.placed.push(placed);
    }

    /// Committed parts in insertion order. The iterator can be cloned to
    /// restart the walk.
    pub fn all(&self) -> impl Iterator<Item = &PlacedPart> + Clone + '_ {
        self.placed.iter()
    }

    /// Number of committed parts.
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    /// True if nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Sum of the oriented volumes of all committed parts.
    pub fn occupied_volume(&self) -> f64 {
        self.occupied_volume
    }

    /// Bounding box around every committed part.
    pub fn hull(&self) -> Option<BoundingBox> {
        self.hull
    }

    /// Consumes the ledger, returning the placed parts in commit order.
    pub fn into_parts(self) -> Vec<PlacedPart> {
        self.placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Orientation, Part};
    use approx::assert_relative_eq;

    fn placed(id: &str, pos: (f64, f64, f64), dims: (f64, f64, f64)) -> PlacedPart {
        let part = Part::new(id, dims.0, dims.1, dims.2).unwrap();
        PlacedPart::new(part, Vec3::from(pos), Orientation::Whd)
    }

    #[test]
    fn empty_ledger_never_overlaps() {
        let ledger = PlacedPartLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.overlaps(Vec3::zero(), Vec3::splat(100.0), 5.0));
        assert!(ledger.hull().is_none());
    }

    #[test]
    fn detects_overlap_and_honours_spacing() {
        let mut ledger = PlacedPartLedger::new();
        ledger.commit(placed("a", (2.0, 2.0, 2.0), (18.0, 10.0, 4.0)));

        assert!(ledger.overlaps(Vec3::new(10.0, 5.0, 3.0), Vec3::splat(2.0), 0.0));
        // flush at exactly the spacing distance
        assert!(!ledger.overlaps(Vec3::new(21.0, 2.0, 2.0), Vec3::splat(3.0), 1.0));
        assert!(!ledger.overlaps(Vec3::new(2.0, 2.0, 7.0), Vec3::new(12.0, 8.0, 3.0), 1.0));
        // closer than the spacing
        assert!(ledger.overlaps(Vec3::new(2.0, 2.0, 6.5), Vec3::new(12.0, 8.0, 3.0), 1.0));
    }

    #[test]
    fn tracks_volume_and_hull() {
        let mut ledger = PlacedPartLedger::new();
        ledger.commit(placed("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0)));
        ledger.commit(placed("b", (10.0, 0.0, 0.0), (5.0, 5.0, 5.0)));

        assert_eq!(ledger.len(), 2);
        assert_relative_eq!(ledger.occupied_volume(), 1125.0);
        let hull = ledger.hull().unwrap();
        assert_eq!(hull.max, Vec3::new(15.0, 10.0, 10.0));
    }

    #[test]
    fn all_yields_insertion_order_and_restarts() {
        let mut ledger = PlacedPartLedger::new();
        ledger.commit(placed("first", (0.0, 0.0, 0.0), (1.0, 1.0, 1.0)));
        ledger.commit(placed("second", (2.0, 0.0, 0.0), (1.0, 1.0, 1.0)));

        let walk = ledger.all();
        let ids: Vec<_> = walk.clone().map(|p| p.part.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(walk.count(), 2);
        assert_eq!(ledger.into_parts().len(), 2);
    }
}
