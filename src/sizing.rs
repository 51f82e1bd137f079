//! Box sizing: propose a box for a part list before packing.
//!
//! The estimate is a heuristic seed. [`size_and_pack`] keeps growing it
//! until the parts actually pack or the attempt budget runs out.

use log::{info, warn};
use serde::Serialize;

use crate::error::{PackingError, Result};
use crate::model::{BoxDimensions, Part};
use crate::packer::{PackEvent, PackingConfig, PackingResult, pack_parts_with_progress};
use crate::types::{Dimensional, EPSILON_GENERAL};

/// Outcome of the estimate-and-pack loop.
#[derive(Clone, Debug, Serialize)]
pub struct SizedPacking {
    /// Result of the last attempt.
    pub result: PackingResult,
    /// Number of boxes tried.
    pub attempts: usize,
    /// Box used in the last attempt.
    pub box_dimensions: BoxDimensions,
    /// Inefficiency factor used in the last attempt.
    pub inefficiency_factor: f64,
}

/// Proposes box dimensions for `parts`.
///
/// Every axis starts at the largest part dimension on that axis plus twice
/// the padding. The three axes are then scaled uniformly (never below 1)
/// until the volume reaches the total part volume times the inefficiency
/// factor, and rounded up to the configured granularity.
///
/// # Examples
/// ```
/// use freight_packer::model::Part;
/// use freight_packer::packer::PackingConfig;
/// use freight_packer::sizing::estimate_box_size;
///
/// let parts = vec![Part::new("cube", 10.0, 10.0, 10.0).unwrap()];
/// let dims = estimate_box_size(&parts, &PackingConfig::default()).unwrap();
/// assert_eq!((dims.width, dims.height, dims.depth), (14.0, 14.0, 14.0));
/// ```
pub fn estimate_box_size(parts: &[Part], config: &PackingConfig) -> Result<BoxDimensions> {
    config.validate()?;
    if parts.is_empty() {
        return Err(PackingError::EmptyInput);
    }
    for part in parts {
        part.validate()?;
    }

    let total_volume: f64 = parts.iter().map(|p| p.volume()).sum();
    let target_volume = total_volume * config.inefficiency_factor;

    let margin = 2.0 * config.padding;
    let axis_max = |axis: fn(&Part) -> f64| parts.iter().map(axis).fold(0.0, f64::max) + margin;
    let width = axis_max(|p| p.dimensions.width);
    let height = axis_max(|p| p.dimensions.height);
    let depth = axis_max(|p| p.dimensions.depth);

    let scale = (target_volume / (width * height * depth)).cbrt().max(1.0);
    let round_up = |value: f64| {
        ((value * scale / config.granularity) - EPSILON_GENERAL).ceil() * config.granularity
    };

    let (width, height, depth) = (round_up(width), round_up(height), round_up(depth));
    Ok(BoxDimensions {
        width,
        height,
        depth,
        volume: width * height * depth,
    })
}

/// Estimates a box, packs into it and retries with a growing inefficiency
/// factor until every part is placed or `max_sizing_attempts` is reached.
pub fn size_and_pack(parts: &[Part], config: &PackingConfig) -> Result<SizedPacking> {
    size_and_pack_with_progress(parts, config, |_| {})
}

/// Like [`size_and_pack`], reporting the events of the final attempt only.
///
/// Events of each attempt are held back until the attempt is known to be
/// the last one, so a listener sees a single box being filled.
pub fn size_and_pack_with_progress(
    parts: &[Part],
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> Result<SizedPacking> {
    config.validate()?;

    let mut attempt_config = *config;
    let mut attempts = 0;
    loop {
        attempts += 1;
        let dims = estimate_box_size(parts, &attempt_config)?;
        let mut events = Vec::new();
        let result = pack_parts_with_progress(&dims.to_box(), parts, &attempt_config, |evt| {
            events.push(evt.clone())
        })?;

        let exhausted = attempts >= config.max_sizing_attempts;
        if result.success || result.aborted || exhausted {
            if result.success {
                info!(
                    "📐 Sized box {}x{}x{} after {} attempt(s)",
                    dims.width, dims.height, dims.depth, attempts
                );
            } else {
                warn!(
                    "📐 Giving up sizing after {} attempt(s); {} part(s) unplaced",
                    attempts, result.stats.unplaced_count
                );
            }
            events.iter().for_each(&mut on_event);
            return Ok(SizedPacking {
                result,
                attempts,
                box_dimensions: dims,
                inefficiency_factor: attempt_config.inefficiency_factor,
            });
        }

        info!(
            "📐 Box {}x{}x{} too small ({} unplaced), growing",
            dims.width, dims.height, dims.depth, result.stats.unplaced_count
        );
        attempt_config.inefficiency_factor *= config.sizing_growth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(id: &str, side: f64) -> Part {
        Part::new(id, side, side, side).unwrap()
    }

    #[test]
    fn floors_scale_at_largest_part() {
        let parts = vec![cube("a", 10.0)];
        let dims = estimate_box_size(&parts, &PackingConfig::default()).unwrap();

        assert_eq!(dims.to_box().width, 14.0);
        assert_relative_eq!(dims.volume, 2744.0);
        assert!(dims.volume >= 1300.0);
    }

    #[test]
    fn scales_up_to_target_volume() {
        let parts: Vec<_> = (0..10)
            .map(|i| Part::new(format!("plate-{i}"), 10.0, 10.0, 1.0).unwrap())
            .collect();
        let dims = estimate_box_size(&parts, &PackingConfig::default()).unwrap();

        // 14 x 14 x 5 = 980 scaled by cbrt(1300 / 980)
        assert_eq!((dims.width, dims.height, dims.depth), (16.0, 16.0, 6.0));
        assert!(dims.volume >= 1300.0);
        assert!(dims.width >= 14.0 && dims.height >= 14.0 && dims.depth >= 5.0);
    }

    #[test]
    fn rounds_up_to_granularity() {
        let parts = vec![Part::new("a", 7.0, 3.0, 1.0).unwrap()];
        let config = PackingConfig::builder()
            .padding(0.0)
            .granularity(5.0)
            .build();
        let dims = estimate_box_size(&parts, &config).unwrap();
        assert_eq!((dims.width, dims.height, dims.depth), (10.0, 5.0, 5.0));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            estimate_box_size(&[], &PackingConfig::default()).unwrap_err(),
            PackingError::EmptyInput
        );
        assert_eq!(
            size_and_pack(&[], &PackingConfig::default()).unwrap_err(),
            PackingError::EmptyInput
        );
    }

    #[test]
    fn single_part_packs_on_first_attempt() {
        let sized = size_and_pack(&[cube("a", 10.0)], &PackingConfig::default()).unwrap();
        assert!(sized.result.success);
        assert_eq!(sized.attempts, 1);
        assert_eq!(sized.box_dimensions.width, 14.0);
    }

    #[test]
    fn retries_with_larger_boxes_until_parts_fit() {
        let parts = vec![cube("a", 10.0), cube("b", 10.0)];
        let config = PackingConfig::builder().padding(0.0).spacing(0.0).build();

        let sized = size_and_pack(&parts, &config).unwrap();

        // 14, 15, 16, 18, 19 are all too small for two 10-cubes side by side
        assert!(sized.result.success);
        assert_eq!(sized.attempts, 6);
        assert_eq!(sized.box_dimensions.width, 20.0);
        assert!(sized.inefficiency_factor > config.inefficiency_factor);
    }

    #[test]
    fn progress_covers_only_the_final_attempt() {
        let parts = vec![cube("a", 10.0), cube("b", 10.0)];
        let config = PackingConfig::builder().padding(0.0).spacing(0.0).build();

        let mut events = Vec::new();
        let sized = size_and_pack_with_progress(&parts, &config, |evt| events.push(evt.clone()))
            .unwrap();

        assert_eq!(sized.attempts, 6);
        assert_eq!(events.len(), 4);
        match &events[0] {
            PackEvent::BoxOpened { dims, .. } => assert_eq!(*dims, (20.0, 20.0, 20.0)),
            other => panic!("expected BoxOpened, got {other:?}"),
        }
        assert!(matches!(
            events[3],
            PackEvent::Finished { placed: 2, unplaced: 0, .. }
        ));
    }

    #[test]
    fn stops_at_attempt_budget() {
        let parts = vec![cube("a", 10.0), cube("b", 10.0)];
        let config = PackingConfig::builder()
            .padding(0.0)
            .spacing(0.0)
            .max_sizing_attempts(2)
            .build();

        let sized = size_and_pack(&parts, &config).unwrap();
        assert!(!sized.result.success);
        assert_eq!(sized.attempts, 2);
        assert_eq!(sized.result.stats.unplaced_count, 1);
    }
}
