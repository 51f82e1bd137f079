//! Extreme point generator for 3D bin packing.
//!
//! Extreme points are candidate positions for the minimum corner of the next
//! part. The set starts with the padded origin corner; every committed part
//! contributes one point flush against each of its three outward faces.
//!
//! The working set is kept as an antichain: a point that is no better than
//! another available point on every axis is dropped, as are points that no
//! positive-size part could occupy because they sit in a committed part's
//! spacing zone (its lower faces included) or on the far side of the padded
//! interior.
//!
//! # References
//!
//! - Crainic, T. G., Perboli, G., & Tadei, R. (2008). Extreme point-based heuristics
//!   for three-dimensional bin packing.

use log::trace;

use crate::ledger::PlacedPartLedger;
use crate::model::{PackingBox, PlacedPart};
use crate::types::{EPSILON_GENERAL, Vec3};

/// Frontier of placement candidates for one packing run.
#[derive(Clone, Debug)]
pub struct ExtremePointSet {
    points: Vec<Vec3>,
    lower: Vec3,
    upper: Vec3,
}

impl ExtremePointSet {
    /// Creates the set for a box: exactly one point at `(padding, padding, padding)`.
    pub fn new(container: &PackingBox, padding: f64) -> Self {
        let interior = container.interior(padding);
        Self {
            points: vec![interior.min],
            lower: interior.min,
            upper: interior.max,
        }
    }

    /// Current candidate points. Order carries no meaning.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of candidate points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no candidate remains.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consumes the set, returning the remaining points.
    pub fn into_points(self) -> Vec<Vec3> {
        self.points
    }

    /// Removes a point once a part has been anchored there.
    pub fn consume(&mut self, point: &Vec3) {
        self.points.retain(|p| !p.approx_eq(point, EPSILON_GENERAL));
    }

    /// Refreshes the frontier after `placed` was committed to `ledger`.
    ///
    /// `ledger` must already contain `placed`.
    pub fn update(&mut self, placed: &PlacedPart, ledger: &PlacedPartLedger, spacing: f64) {
        self.consume(&placed.position);

        self.points.retain(|p| !is_stale(p, ledger, spacing));

        let Vec3 { x, y, z } = placed.position;
        let e = placed.extents;
        let generated = [
            Vec3::new(x + e.x + spacing, y, z),
            Vec3::new(x, y + e.y + spacing, z),
            Vec3::new(x, y, z + e.z + spacing),
        ];

        for point in generated {
            if !self.can_host(&point) {
                trace!("extreme point {:?} lies outside the interior", point);
                continue;
            }
            if is_stale(&point, ledger, spacing) {
                trace!("extreme point {:?} lies inside a spacing zone", point);
                continue;
            }
            self.insert(point);
        }
    }

    /// Inserts a point unless an existing point dominates it, then drops
    /// the points it dominates.
    fn insert(&mut self, point: Vec3) {
        if self.points.iter().any(|p| dominates(p, &point)) {
            return;
        }
        self.points.retain(|p| !dominates(&point, p));
        self.points.push(point);
    }

    /// A point can host a positive-size part only strictly below the upper
    /// interior bound on every axis.
    fn can_host(&self, point: &Vec3) -> bool {
        self.lower.le_all(point, EPSILON_GENERAL)
            && point.x < self.upper.x - EPSILON_GENERAL
            && point.y < self.upper.y - EPSILON_GENERAL
            && point.z < self.upper.z - EPSILON_GENERAL
    }
}

/// `a` dominates `b` if it is smaller or equal on every axis. Equal points
/// count as dominated so the set never holds duplicates.
fn dominates(a: &Vec3, b: &Vec3) -> bool {
    a.le_all(b, EPSILON_GENERAL)
}

/// Edge length of the smallest part a point has to host. It exceeds the
/// overlap tolerance so that a point on the lower face of a spacing zone
/// still collides.
const SLIVER: f64 = 4.0 * EPSILON_GENERAL;

/// A point is stale when even a sliver anchored there would come too
/// close to a committed part.
fn is_stale(point: &Vec3, ledger: &PlacedPartLedger, spacing: f64) -> bool {
    ledger.overlaps(*point, Vec3::splat(SLIVER), spacing)
}
