//! Arrangement engine for sequential ("print one object at a time") FFF
//! printing.
//!
//! - Objects arrive as stacked 2D convex hulls at the printer's slice
//!   heights; the engine decides a position and a print order per object so
//!   that the moving extruder assembly never collides with an already
//!   printed neighbour, and spills overflow onto additional plates.
//! - The geometric core is an SMT formulation over linear real arithmetic
//!   (Z3): weak non-overlap up front, lazily refined with edge
//!   non-intersection clauses, driven by a binary-centred bounding box
//!   optimiser and a sub-global group scheduler.
//! - An independent printability checker re-verifies any proposed
//!   arrangement.
//!
//! Quick example:
//! ```ignore
//! use seq_arrange_core::prelude::*;
//!
//! let printer = presets::printer_geometry_mk4();
//! let config = SolverConfiguration::from_printer_geometry(&printer);
//! let plates = schedule_objects_for_sequential_print(&config, &printer, &objects)?;
//! assert!(check_scheduled_objects_for_sequential_printability(
//!     &config, &printer, &objects, &plates
//! ));
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod rational;
pub mod solver;

pub use checker::*;
pub use config::*;
pub use error::*;
pub use model::*;
pub use pipeline::*;
pub use rational::Rational;

/// Convenience prelude for common types and functions.
/// Importing `seq_arrange_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::checker::check_scheduled_objects_for_sequential_printability;
    pub use crate::config::{
        ArrangementMode, DecimationPrecision, SolverConfiguration, SolverConfigurationBuilder,
    };
    pub use crate::error::{Result, SeqArrangeError};
    pub use crate::geometry::{Point, Polygon};
    pub use crate::model::{ObjectToPrint, PrinterGeometry, ScheduledObject, ScheduledPlate};
    pub use crate::pipeline::{
        schedule_objects_for_sequential_print,
        schedule_objects_for_sequential_print_with_progress,
        schedule_objects_with_preprocessed_zones, PROGRESS_RANGE,
    };
    pub use crate::preprocess::presets;
    pub use crate::rational::Rational;
}
