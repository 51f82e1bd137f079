//! Packing orchestration for a single box.
//!
//! The packer sorts the parts, then drives the commit loop: for every part
//! the [`PlacementSelector`] picks the best anchor among the current extreme
//! points, the part is committed to the [`PlacedPartLedger`] and the
//! [`ExtremePointSet`] is refreshed. Parts that fit nowhere are collected as
//! unplaced; that is a normal outcome, not an error.
//!
//! Exactly one writer touches the ledger and the point set. Only the
//! read-only candidate evaluation inside the selector may run in parallel.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{PackingError, Result};
use crate::extreme_point::ExtremePointSet;
use crate::ledger::PlacedPartLedger;
use crate::model::{Orientation, PackingBox, Part, PlacedPart, ensure_unique_ids};
use crate::placement::{PlacementSelector, fits_interior};
use crate::types::{CenterOfMassCalculator, Dimensional, Vec3, Weighted};

/// Configuration for the packing engine.
///
/// Holds the geometric margins, the box sizing knobs and the cooperative
/// budgets that bound a single run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Empty margin kept clear of every box wall.
    pub padding: f64,
    /// Minimum gap between any two parts.
    pub spacing: f64,
    /// Slack multiplier applied to the total part volume when sizing a box.
    pub inefficiency_factor: f64,
    /// Unit the estimated box dimensions are rounded up to.
    pub granularity: f64,
    /// Place heavier parts first.
    pub weight_distribution: bool,
    /// Minimum number of (point, orientation) pairs evaluated on the rayon pool.
    pub parallel_threshold: usize,
    /// Wall-clock budget for one run.
    pub time_budget: Option<Duration>,
    /// Maximum number of parts attempted in one run.
    pub part_budget: Option<usize>,
    /// Number of estimate-and-pack attempts before giving up.
    pub max_sizing_attempts: usize,
    /// Factor the inefficiency factor grows by between sizing attempts.
    pub sizing_growth: f64,
}

impl PackingConfig {
    pub const DEFAULT_PADDING: f64 = 2.0;
    pub const DEFAULT_SPACING: f64 = 1.0;
    pub const DEFAULT_INEFFICIENCY_FACTOR: f64 = 1.3;
    pub const DEFAULT_GRANULARITY: f64 = 1.0;
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 512;
    pub const DEFAULT_MAX_SIZING_ATTEMPTS: usize = 8;
    pub const DEFAULT_SIZING_GROWTH: f64 = 1.25;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(PackingError::InvalidOption(format!(
                "padding must be a non-negative number, got {}",
                self.padding
            )));
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(PackingError::InvalidOption(format!(
                "spacing must be a non-negative number, got {}",
                self.spacing
            )));
        }
        if !self.inefficiency_factor.is_finite() || self.inefficiency_factor <= 0.0 {
            return Err(PackingError::InvalidOption(format!(
                "inefficiency factor must be positive, got {}",
                self.inefficiency_factor
            )));
        }
        if !self.granularity.is_finite() || self.granularity <= 0.0 {
            return Err(PackingError::InvalidOption(format!(
                "granularity must be positive, got {}",
                self.granularity
            )));
        }
        if !self.sizing_growth.is_finite() || self.sizing_growth <= 1.0 {
            return Err(PackingError::InvalidOption(format!(
                "sizing growth must be greater than 1, got {}",
                self.sizing_growth
            )));
        }
        if self.max_sizing_attempts == 0 {
            return Err(PackingError::InvalidOption(
                "at least one sizing attempt is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            padding: Self::DEFAULT_PADDING,
            spacing: Self::DEFAULT_SPACING,
            inefficiency_factor: Self::DEFAULT_INEFFICIENCY_FACTOR,
            granularity: Self::DEFAULT_GRANULARITY,
            weight_distribution: false,
            parallel_threshold: Self::DEFAULT_PARALLEL_THRESHOLD,
            time_budget: None,
            part_budget: None,
            max_sizing_attempts: Self::DEFAULT_MAX_SIZING_ATTEMPTS,
            sizing_growth: Self::DEFAULT_SIZING_GROWTH,
        }
    }
}

/// Builder for [`PackingConfig`].
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Sets the wall padding.
    pub fn padding(mut self, padding: f64) -> Self {
        self.config.padding = padding;
        self
    }

    /// Sets the minimum gap between parts.
    pub fn spacing(mut self, spacing: f64) -> Self {
        self.config.spacing = spacing;
        self
    }

    /// Sets the box sizing slack multiplier.
    pub fn inefficiency_factor(mut self, factor: f64) -> Self {
        self.config.inefficiency_factor = factor;
        self
    }

    /// Sets the rounding unit for estimated box dimensions.
    pub fn granularity(mut self, granularity: f64) -> Self {
        self.config.granularity = granularity;
        self
    }

    /// Enables heavier-first ordering.
    pub fn weight_distribution(mut self, enabled: bool) -> Self {
        self.config.weight_distribution = enabled;
        self
    }

    /// Sets the amount of candidate work that switches to parallel evaluation.
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    /// Bounds the wall-clock time of one run.
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.config.time_budget = Some(budget);
        self
    }

    /// Bounds the number of parts attempted in one run.
    pub fn part_budget(mut self, budget: usize) -> Self {
        self.config.part_budget = Some(budget);
        self
    }

    /// Sets how often the sizing loop may retry.
    pub fn max_sizing_attempts(mut self, attempts: usize) -> Self {
        self.config.max_sizing_attempts = attempts;
        self
    }

    /// Sets the growth factor between sizing attempts.
    pub fn sizing_growth(mut self, growth: f64) -> Self {
        self.config.sizing_growth = growth;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Outcome of a packing run.
#[derive(Clone, Debug, Serialize)]
pub struct PackingResult {
    pub container: PackingBox,
    pub placed_parts: Vec<PlacedPart>,
    pub unplaced_parts: Vec<UnplacedPart>,
    pub stats: PackingStats,
    /// True when every part was placed.
    pub success: bool,
    /// True when a budget stopped the run early.
    pub aborted: bool,
    /// Extreme points still open when the run ended.
    pub remaining_points: Vec<Vec3>,
}

impl PackingResult {
    /// Looks up the placement of a part by id.
    pub fn placement_of(&self, id: &str) -> Option<&PlacedPart> {
        self.placed_parts.iter().find(|p| p.part.id == id)
    }

    /// Ids of the parts that were not placed, in processing order.
    pub fn unplaced_ids(&self) -> Vec<&str> {
        self.unplaced_parts
            .iter()
            .map(|u| u.part.id.as_str())
            .collect()
    }
}

/// Aggregate figures of a packing run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PackingStats {
    /// Sum of the placed parts' oriented volumes.
    pub total_volume: f64,
    pub box_volume: f64,
    /// `round(total_volume / box_volume * 100)`.
    pub space_efficiency: u32,
    pub placed_count: usize,
    pub unplaced_count: usize,
    pub total_weight: f64,
    /// Weighted center of the placed parts; `None` without any weight.
    pub center_of_mass: Option<Vec3>,
}

impl PackingStats {
    fn collect(container: &PackingBox, placed: &[PlacedPart], unplaced_count: usize) -> Self {
        let total_volume: f64 = placed.iter().map(|p| p.volume()).sum();
        let box_volume = container.volume();
        let mut com = CenterOfMassCalculator::new();
        for p in placed {
            com.add_point(p.center(), p.weight());
        }

        Self {
            total_volume,
            box_volume,
            space_efficiency: (total_volume / box_volume * 100.0).round() as u32,
            placed_count: placed.len(),
            unplaced_count,
            total_weight: placed.iter().map(|p| p.weight()).sum(),
            center_of_mass: com.compute(),
        }
    }
}

/// Part that could not be placed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnplacedPart {
    pub part: Part,
    pub reason: UnplacedReason,
}

/// Why a part was not placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    DimensionsExceedBox,
    NoValidPosition,
    BudgetExhausted,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::DimensionsExceedBox => "dimensions_exceed_box",
            UnplacedReason::NoValidPosition => "no_valid_position",
            UnplacedReason::BudgetExhausted => "budget_exhausted",
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::DimensionsExceedBox => write!(
                f,
                "Part does not fit the padded box interior in any allowed orientation"
            ),
            UnplacedReason::NoValidPosition => write!(
                f,
                "No free position left that keeps padding and spacing"
            ),
            UnplacedReason::BudgetExhausted => {
                write!(f, "Packing budget exhausted before the part was attempted")
            }
        }
    }
}

/// Events emitted while packing, for live progress and step-by-step playback.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Packing into a box starts.
    BoxOpened {
        dims: (f64, f64, f64),
        padding: f64,
        spacing: f64,
        parts: usize,
    },
    /// A part was committed.
    PartPlaced {
        id: String,
        pos: (f64, f64, f64),
        dims: (f64, f64, f64),
        orientation: Orientation,
        weight: Option<f64>,
        color: Option<String>,
        placed: usize,
    },
    /// A part could not be placed.
    PartRejected {
        id: String,
        dims: (f64, f64, f64),
        reason_code: String,
        reason_text: String,
    },
    /// Packing finished.
    Finished {
        placed: usize,
        unplaced: usize,
        space_efficiency: u32,
        aborted: bool,
    },
}

/// A packing session: one box, an accumulated part list and a configuration.
///
/// Input is validated as it is added; nothing survives between sessions.
///
/// # Examples
/// ```
/// use freight_packer::model::Part;
/// use freight_packer::packer::{BoxPacker, PackingConfig};
///
/// let mut packer = BoxPacker::new(PackingConfig::default());
/// packer.set_box(28.0, 22.0, 16.0).unwrap();
/// packer
///     .add_parts(vec![
///         Part::new("PN-1234", 12.0, 8.0, 3.0).unwrap(),
///         Part::new("PN-5678", 18.0, 10.0, 4.0).unwrap(),
///     ])
///     .unwrap();
///
/// let result = packer.pack().unwrap();
/// assert!(result.success);
/// assert_eq!(result.stats.space_efficiency, 10);
/// ```
#[derive(Clone, Debug, Default)]
pub struct BoxPacker {
    config: PackingConfig,
    container: Option<PackingBox>,
    parts: Vec<Part>,
}

impl BoxPacker {
    /// Creates an empty session.
    pub fn new(config: PackingConfig) -> Self {
        Self {
            config,
            container: None,
            parts: Vec::new(),
        }
    }

    /// Sets the box, rejecting non-positive dimensions.
    pub fn set_box(&mut self, width: f64, height: f64, depth: f64) -> Result<&mut Self> {
        self.container = Some(PackingBox::new(width, height, depth)?);
        Ok(self)
    }

    /// Consuming variant of [`BoxPacker::set_box`].
    pub fn with_box(mut self, width: f64, height: f64, depth: f64) -> Result<Self> {
        self.set_box(width, height, depth)?;
        Ok(self)
    }

    /// Adds one part after validating it and its id.
    pub fn add_part(&mut self, part: Part) -> Result<&mut Self> {
        part.validate()?;
        if self.parts.iter().any(|p| p.id == part.id) {
            return Err(PackingError::DuplicatePartId(part.id));
        }
        self.parts.push(part);
        Ok(self)
    }

    /// Adds several parts. Stops at the first invalid one.
    pub fn add_parts(&mut self, parts: impl IntoIterator<Item = Part>) -> Result<&mut Self> {
        for part in parts {
            self.add_part(part)?;
        }
        Ok(self)
    }

    /// Parts added so far, in input order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The configured box, if any.
    pub fn container(&self) -> Option<&PackingBox> {
        self.container.as_ref()
    }

    /// The session configuration.
    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    /// Packs the accumulated parts into the box.
    pub fn pack(&self) -> Result<PackingResult> {
        self.pack_with_progress(|_| {})
    }

    /// Like [`BoxPacker::pack`], reporting every step to `on_event`.
    pub fn pack_with_progress(&self, on_event: impl FnMut(&PackEvent)) -> Result<PackingResult> {
        let container = self
            .container
            .ok_or_else(|| PackingError::Configuration("box not set".to_string()))?;
        pack_parts_with_progress(&container, &self.parts, &self.config, on_event)
    }
}

/// Packs `parts` into `container`.
///
/// Fails only on malformed input; parts that do not fit are reported in the
/// result.
pub fn pack_parts(
    container: &PackingBox,
    parts: &[Part],
    config: &PackingConfig,
) -> Result<PackingResult> {
    pack_parts_with_progress(container, parts, config, |_| {})
}

/// Packing with a live progress callback (suitable for SSE).
pub fn pack_parts_with_progress(
    container: &PackingBox,
    parts: &[Part],
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> Result<PackingResult> {
    config.validate()?;
    container
        .validate()
        .map_err(|e| PackingError::Configuration(e.to_string()))?;
    if parts.is_empty() {
        return Err(PackingError::EmptyInput);
    }
    for part in parts {
        part.validate()?;
    }
    ensure_unique_ids(parts)?;

    Ok(run(container, parts, config, &mut on_event))
}

/// Processing order: volume descending (or weight first when enabled), input
/// order breaking ties.
fn processing_order(parts: &[Part], config: &PackingConfig) -> Vec<usize> {
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&parts[a], &parts[b]);
        let by_weight = if config.weight_distribution {
            b.weight().total_cmp(&a.weight())
        } else {
            Ordering::Equal
        };
        by_weight.then_with(|| b.volume().total_cmp(&a.volume()))
    });
    order
}

fn budget_exhausted(config: &PackingConfig, started: Instant, attempted: usize) -> bool {
    config.time_budget.is_some_and(|b| started.elapsed() >= b)
        || config.part_budget.is_some_and(|b| attempted >= b)
}

fn run(
    container: &PackingBox,
    parts: &[Part],
    config: &PackingConfig,
    on_event: &mut impl FnMut(&PackEvent),
) -> PackingResult {
    let started = Instant::now();
    on_event(&PackEvent::BoxOpened {
        dims: (container.width, container.height, container.depth),
        padding: config.padding,
        spacing: config.spacing,
        parts: parts.len(),
    });

    let mut ledger = PlacedPartLedger::new();
    let mut points = ExtremePointSet::new(container, config.padding);
    let mut unplaced: Vec<UnplacedPart> = Vec::new();
    let mut aborted = false;

    for (attempted, idx) in processing_order(parts, config).into_iter().enumerate() {
        let part = &parts[idx];

        if !aborted && budget_exhausted(config, started, attempted) {
            warn!(
                "⏱️ Packing budget exhausted after {} of {} parts",
                attempted,
                parts.len()
            );
            aborted = true;
        }

        let reason = if aborted {
            UnplacedReason::BudgetExhausted
        } else {
            let selection =
                PlacementSelector::new(container, &ledger, config).select(part, points.points());
            match selection {
                Some(placement) => {
                    let placed =
                        PlacedPart::new(part.clone(), placement.position, placement.orientation);
                    ledger.commit(placed.clone());
                    points.update(&placed, &ledger, config.spacing);
                    debug!(
                        "📍 Placed '{}' at {:?} as {:?} ({} open points)",
                        part.id,
                        placed.position.as_tuple(),
                        placed.orientation,
                        points.len()
                    );
                    on_event(&PackEvent::PartPlaced {
                        id: placed.part.id.clone(),
                        pos: placed.position.as_tuple(),
                        dims: placed.extents.as_tuple(),
                        orientation: placed.orientation,
                        weight: placed.part.weight,
                        color: placed.part.color.clone(),
                        placed: ledger.len(),
                    });
                    continue;
                }
                None if fits_interior(part, container, config.padding) => {
                    UnplacedReason::NoValidPosition
                }
                None => UnplacedReason::DimensionsExceedBox,
            }
        };

        debug!("🚫 Could not place '{}': {}", part.id, reason);
        on_event(&PackEvent::PartRejected {
            id: part.id.clone(),
            dims: part.dimensions.as_vec3().as_tuple(),
            reason_code: reason.code().to_string(),
            reason_text: reason.to_string(),
        });
        unplaced.push(UnplacedPart {
            part: part.clone(),
            reason,
        });
    }

    let remaining_points = points.into_points();
    let placed_parts = ledger.into_parts();
    let stats = PackingStats::collect(container, &placed_parts, unplaced.len());

    info!(
        "📦 Packed {}/{} parts into {}x{}x{} ({}% space efficiency)",
        stats.placed_count,
        parts.len(),
        container.width,
        container.height,
        container.depth,
        stats.space_efficiency
    );
    on_event(&PackEvent::Finished {
        placed: stats.placed_count,
        unplaced: stats.unplaced_count,
        space_efficiency: stats.space_efficiency,
        aborted,
    });

    PackingResult {
        container: *container,
        success: unplaced.is_empty(),
        placed_parts,
        unplaced_parts: unplaced,
        stats,
        aborted,
        remaining_points,
    }
}
