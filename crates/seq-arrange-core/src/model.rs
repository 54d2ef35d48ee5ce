use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::geometry::Polygon;

/// One object handed over by the caller: a stable id, an optional glue link to
/// the next object in the input, the total height, and the 2D convex-hull
/// projections of the object above each printer slice height.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectToPrint {
    pub id: i32,
    /// Forces this object and its successor in the input to be printed
    /// back-to-back on the same plate.
    #[serde(default)]
    pub glued_to_next: bool,
    pub total_height: i64,
    /// Pairs of (slice height, convex hull of the object above that height),
    /// keyed by the heights the printer geometry describes.
    pub pgns_at_height: Vec<(i64, Polygon)>,
}

/// Geometry of the printer relevant for sequential collision checking.
///
/// `x_size`/`y_size` are the rectangular bed extents in slicer units. Every
/// height in `convex_heights` and `box_heights` has an entry in
/// `extruder_slices` describing the outline of the moving assembly at that
/// height. Convex slices are compact carriers around the nozzle; box slices
/// are treated as bars spanning the whole bed along X.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterGeometry {
    pub x_size: i64,
    pub y_size: i64,
    pub convex_heights: BTreeSet<i64>,
    pub box_heights: BTreeSet<i64>,
    pub extruder_slices: BTreeMap<i64, Vec<Polygon>>,
}

impl PrinterGeometry {
    /// True when the height is described by this geometry at all.
    pub fn supports_height(&self, height: i64) -> bool {
        self.convex_heights.contains(&height) || self.box_heights.contains(&height)
    }
}

/// Placement of one object on a plate, in slicer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledObject {
    pub id: i32,
    pub x: i64,
    pub y: i64,
}

impl ScheduledObject {
    pub fn new(id: i32, x: i64, y: i64) -> Self {
        Self { id, x, y }
    }
}

/// Objects assigned to one bed, in print order (first printed first).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduledPlate {
    pub scheduled_objects: Vec<ScheduledObject>,
}
