//! Data models for the box packing engine.
//!
//! This module defines the fundamental records exchanged with callers:
//! - `Part`: a rectangular item to pack, with optional weight and color
//! - `PlacedPart`: a part committed to a position and orientation
//! - `PackingBox`: the box the parts go into
//! - `BoxDimensions`: the estimator's proposed box
//!
//! Inputs are validated when they are constructed or handed to the packer,
//! never deferred to the packing loop.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::error::{PackingError, Result, validate_dimension, validate_weight};
use crate::types::{BoundingBox, Dimensional, Vec3, Weighted};

/// Width, height and depth of a part or box, in any consistent unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "width": 12.0, "height": 8.0, "depth": 3.0 }))]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Dimensions {
    /// Creates dimensions with validation.
    ///
    /// # Examples
    /// ```
    /// use freight_packer::model::Dimensions;
    ///
    /// assert!(Dimensions::new(12.0, 8.0, 3.0).is_ok());
    /// assert!(Dimensions::new(-12.0, 8.0, 3.0).is_err());
    /// ```
    pub fn new(width: f64, height: f64, depth: f64) -> Result<Self> {
        let dims = Self {
            width,
            height,
            depth,
        };
        dims.validate("Dimensions")?;
        Ok(dims)
    }

    /// Checks that all three values are positive and finite.
    pub fn validate(&self, owner: &str) -> Result<()> {
        validate_dimension(self.width, &format!("{} width", owner))?;
        validate_dimension(self.height, &format!("{} height", owner))?;
        validate_dimension(self.depth, &format!("{} depth", owner))?;
        Ok(())
    }

    /// Volume as width × height × depth.
    pub fn volume(&self) -> f64 {
        self.width * self.height * self.depth
    }

    /// Unrotated extents as a vector.
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }
}

/// One axis-aligned permutation of a part's (width, height, depth) triple.
///
/// The name lists which source dimension lands on x, y and z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Whd,
    Wdh,
    Hwd,
    Hdw,
    Dwh,
    Dhw,
}

impl Orientation {
    /// All six permutations in index order.
    pub const ALL: [Orientation; 6] = [
        Orientation::Whd,
        Orientation::Wdh,
        Orientation::Hwd,
        Orientation::Hdw,
        Orientation::Dwh,
        Orientation::Dhw,
    ];

    /// Orientations that keep the part's height on the y axis.
    pub const UPRIGHT: [Orientation; 2] = [Orientation::Whd, Orientation::Dhw];

    /// Stable index used as the last tie-breaker during selection.
    pub fn index(&self) -> usize {
        match self {
            Orientation::Whd => 0,
            Orientation::Wdh => 1,
            Orientation::Hwd => 2,
            Orientation::Hdw => 3,
            Orientation::Dwh => 4,
            Orientation::Dhw => 5,
        }
    }

    /// Extents along (x, y, z) when the dimensions are rotated this way.
    pub fn apply(&self, dims: &Dimensions) -> Vec3 {
        let (w, h, d) = (dims.width, dims.height, dims.depth);
        match self {
            Orientation::Whd => Vec3::new(w, h, d),
            Orientation::Wdh => Vec3::new(w, d, h),
            Orientation::Hwd => Vec3::new(h, w, d),
            Orientation::Hdw => Vec3::new(h, d, w),
            Orientation::Dwh => Vec3::new(d, w, h),
            Orientation::Dhw => Vec3::new(d, h, w),
        }
    }
}

fn all_orientations() -> Vec<Orientation> {
    Orientation::ALL.to_vec()
}

/// A rectangular part to be packed.
///
/// Parts are immutable input; packing produces a new [`PlacedPart`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "PN-1234",
    "dimensions": { "width": 12.0, "height": 8.0, "depth": 3.0 },
    "weight": 2.5,
    "color": "#3B82F6"
}))]
pub struct Part {
    pub id: String,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "all_orientations")]
    pub allowed_orientations: Vec<Orientation>,
}

impl Part {
    /// Creates a part that may be rotated freely.
    ///
    /// # Examples
    /// ```
    /// use freight_packer::model::Part;
    ///
    /// let part = Part::new("PN-5678", 18.0, 10.0, 4.0).unwrap();
    /// assert_eq!(part.allowed_orientations.len(), 6);
    /// assert!(Part::new("bad", 0.0, 10.0, 4.0).is_err());
    /// ```
    pub fn new(id: impl Into<String>, width: f64, height: f64, depth: f64) -> Result<Self> {
        let part = Self {
            id: id.into(),
            dimensions: Dimensions {
                width,
                height,
                depth,
            },
            weight: None,
            color: None,
            allowed_orientations: all_orientations(),
        };
        part.validate()?;
        Ok(part)
    }

    /// Sets the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Sets the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Restricts the part to its given orientation.
    pub fn fixed(mut self) -> Self {
        self.allowed_orientations = vec![Orientation::Whd];
        self
    }

    /// Restricts the part to orientations that keep its height vertical.
    pub fn upright(mut self) -> Self {
        self.allowed_orientations = Orientation::UPRIGHT.to_vec();
        self
    }

    /// Replaces the allowed orientation set.
    pub fn with_orientations(mut self, orientations: Vec<Orientation>) -> Self {
        self.allowed_orientations = orientations;
        self
    }

    /// Validates dimensions, weight and orientation set.
    pub fn validate(&self) -> Result<()> {
        self.dimensions.validate(&format!("Part '{}'", self.id))?;
        validate_weight(self.weight, &format!("part '{}'", self.id))?;
        if self.allowed_orientations.is_empty() {
            return Err(PackingError::InvalidOrientation(format!(
                "part '{}' allows no orientation",
                self.id
            )));
        }
        Ok(())
    }
}

impl Dimensional for Part {
    fn extents(&self) -> Vec3 {
        self.dimensions.as_vec3()
    }
}

impl Weighted for Part {
    fn weight(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }
}

/// Checks that no two parts share an id.
pub fn ensure_unique_ids<'a>(parts: impl IntoIterator<Item = &'a Part>) -> Result<()> {
    let mut seen = HashSet::new();
    for part in parts {
        if !seen.insert(part.id.as_str()) {
            return Err(PackingError::DuplicatePartId(part.id.clone()));
        }
    }
    Ok(())
}

/// A part committed to a position inside the box.
///
/// Created exactly once per part and never moved afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacedPart {
    pub part: Part,
    /// Minimum corner.
    pub position: Vec3,
    pub orientation: Orientation,
    /// Extents along (x, y, z) under `orientation`.
    pub extents: Vec3,
}

impl PlacedPart {
    /// Creates a placed part, deriving the extents from the orientation.
    pub fn new(part: Part, position: Vec3, orientation: Orientation) -> Self {
        let extents = orientation.apply(&part.dimensions);
        Self {
            part,
            position,
            orientation,
            extents,
        }
    }

    /// Bounding box of the placed part.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_extents(self.position, self.extents)
    }

    /// Geometric center of the placed part.
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.position + self.extents * 0.5
    }
}

impl Dimensional for PlacedPart {
    fn extents(&self) -> Vec3 {
        self.extents
    }
}

impl Weighted for PlacedPart {
    fn weight(&self) -> f64 {
        self.part.weight()
    }
}

/// The box parts are packed into. Immutable once packing starts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "width": 28.0, "height": 22.0, "depth": 16.0 }))]
pub struct PackingBox {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl PackingBox {
    /// Creates a box with validation.
    pub fn new(width: f64, height: f64, depth: f64) -> Result<Self> {
        validate_dimension(width, "Box width")?;
        validate_dimension(height, "Box height")?;
        validate_dimension(depth, "Box depth")?;
        Ok(Self {
            width,
            height,
            depth,
        })
    }

    /// Re-checks a box that did not come through [`PackingBox::new`].
    pub fn validate(&self) -> Result<()> {
        Self::new(self.width, self.height, self.depth).map(|_| ())
    }

    /// Calculates the total volume of the box.
    pub fn volume(&self) -> f64 {
        self.width * self.height * self.depth
    }

    /// Region parts may occupy once `padding` is kept clear of every wall.
    pub fn interior(&self, padding: f64) -> BoundingBox {
        BoundingBox::new(
            Vec3::splat(padding),
            Vec3::new(
                self.width - padding,
                self.height - padding,
                self.depth - padding,
            ),
        )
    }

    /// Box dimensions with the derived volume.
    pub fn dimensions(&self) -> BoxDimensions {
        BoxDimensions {
            width: self.width,
            height: self.height,
            depth: self.depth,
            volume: self.volume(),
        }
    }
}

impl Dimensional for PackingBox {
    fn extents(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }
}

impl From<Dimensions> for PackingBox {
    fn from(dims: Dimensions) -> Self {
        Self {
            width: dims.width,
            height: dims.height,
            depth: dims.depth,
        }
    }
}

/// Box dimensions proposed by the sizing estimator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoxDimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub volume: f64,
}

impl BoxDimensions {
    /// The proposed box as a packable container.
    pub fn to_box(&self) -> PackingBox {
        PackingBox {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}
