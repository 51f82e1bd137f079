//! 3D bin packing for shipping parts in a box.
//!
//! Parts are placed greedily at extreme points, largest first, keeping a
//! wall padding and a minimum spacing between parts. Parts that fit nowhere
//! are reported, never treated as errors.
//!
//! ```
//! use freight_packer::{BoxPacker, PackingConfig, Part};
//!
//! let mut packer = BoxPacker::new(PackingConfig::default());
//! packer.set_box(10.0, 10.0, 10.0).unwrap();
//! packer.add_part(Part::new("big", 20.0, 20.0, 20.0).unwrap()).unwrap();
//!
//! let result = packer.pack().unwrap();
//! assert!(!result.success);
//! assert_eq!(result.unplaced_ids(), vec!["big"]);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod extreme_point;
pub mod geometry;
pub mod ledger;
pub mod model;
pub mod packer;
pub mod placement;
pub mod shipment;
pub mod sizing;
pub mod types;

pub use error::{PackingError, Result};
pub use model::{BoxDimensions, Dimensions, Orientation, PackingBox, Part, PlacedPart};
pub use packer::{
    BoxPacker, PackEvent, PackingConfig, PackingResult, PackingStats, UnplacedPart,
    UnplacedReason, pack_parts, pack_parts_with_progress,
};
pub use shipment::{ShipmentPlan, pack_shipments};
pub use sizing::{SizedPacking, estimate_box_size, size_and_pack, size_and_pack_with_progress};
pub use types::Vec3;
