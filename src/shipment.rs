//! Multi-box shipments as repeated single-box packing.
//!
//! Each round packs the residual part set into a fresh box of the same
//! size. No cross-box optimisation happens.

use log::{info, warn};
use serde::Serialize;

use crate::error::{PackingError, Result};
use crate::model::{PackingBox, Part};
use crate::packer::{PackingConfig, PackingResult, pack_parts};

/// Boxes needed to ship a part list.
#[derive(Clone, Debug, Serialize)]
pub struct ShipmentPlan {
    /// One packing result per box, in fill order.
    pub shipments: Vec<PackingResult>,
    /// Parts that were left over: either no fresh box accepts them or the
    /// box limit was reached first.
    pub oversized: Vec<Part>,
    pub total_shipments: usize,
    /// True when every part ended up in some box.
    pub is_complete: bool,
}

/// Packs `parts` into as many boxes of the given size as needed, up to
/// `max_boxes`.
pub fn pack_shipments(
    container: &PackingBox,
    parts: &[Part],
    config: &PackingConfig,
    max_boxes: usize,
) -> Result<ShipmentPlan> {
    if max_boxes == 0 {
        return Err(PackingError::InvalidOption(
            "max_boxes must be at least 1".to_string(),
        ));
    }
    if parts.is_empty() {
        return Err(PackingError::EmptyInput);
    }

    let mut shipments = Vec::new();
    let mut remaining: Vec<Part> = parts.to_vec();

    while !remaining.is_empty() && shipments.len() < max_boxes {
        let result = pack_parts(container, &remaining, config)?;
        if result.placed_parts.is_empty() {
            warn!(
                "🚚 {} part(s) do not fit an empty box, stopping",
                remaining.len()
            );
            break;
        }

        remaining = result
            .unplaced_parts
            .iter()
            .map(|u| u.part.clone())
            .collect();
        shipments.push(result);
    }

    info!(
        "🚚 Planned {} shipment(s), {} part(s) left over",
        shipments.len(),
        remaining.len()
    );
    Ok(ShipmentPlan {
        total_shipments: shipments.len(),
        is_complete: remaining.is_empty(),
        shipments,
        oversized: remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubes(n: usize, side: f64) -> Vec<Part> {
        (0..n)
            .map(|i| Part::new(format!("c{i}"), side, side, side).unwrap())
            .collect()
    }

    fn tight() -> PackingConfig {
        PackingConfig::builder().padding(0.0).spacing(0.0).build()
    }

    #[test]
    fn splits_across_boxes() {
        let container = PackingBox::new(20.0, 20.0, 20.0).unwrap();
        let plan = pack_shipments(&container, &cubes(10, 10.0), &tight(), 5).unwrap();

        assert!(plan.is_complete);
        assert_eq!(plan.total_shipments, 2);
        assert_eq!(plan.shipments[0].placed_parts.len(), 8);
        assert_eq!(plan.shipments[1].placed_parts.len(), 2);
        assert!(plan.oversized.is_empty());
    }

    #[test]
    fn reports_parts_no_box_accepts() {
        let container = PackingBox::new(20.0, 20.0, 20.0).unwrap();
        let mut parts = cubes(1, 10.0);
        parts.push(Part::new("huge", 30.0, 5.0, 5.0).unwrap());

        let plan = pack_shipments(&container, &parts, &tight(), 5).unwrap();

        assert!(!plan.is_complete);
        assert_eq!(plan.total_shipments, 1);
        assert_eq!(plan.oversized.len(), 1);
        assert_eq!(plan.oversized[0].id, "huge");
    }

    #[test]
    fn respects_box_limit() {
        let container = PackingBox::new(10.0, 10.0, 10.0).unwrap();
        let plan = pack_shipments(&container, &cubes(3, 10.0), &tight(), 2).unwrap();

        assert_eq!(plan.total_shipments, 2);
        assert!(!plan.is_complete);
        assert_eq!(plan.oversized.len(), 1);
    }

    #[test]
    fn rejects_zero_box_limit() {
        let container = PackingBox::new(10.0, 10.0, 10.0).unwrap();
        assert!(matches!(
            pack_shipments(&container, &cubes(1, 1.0), &tight(), 0),
            Err(PackingError::InvalidOption(_))
        ));
    }
}
