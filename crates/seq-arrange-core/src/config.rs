use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::PrinterGeometry;
use crate::preprocess::{SLICER_SCALE_FACTOR, SOLVER_SCALE_FACTOR};

/// Smallest bounding box the optimiser will ever try, in bed units.
pub const MINIMUM_BOUNDING_BOX_SIZE: i64 = 10;
/// Default number of objects decided by one solver group.
pub const DEFAULT_OBJECT_GROUP_SIZE: usize = 4;
/// Default minimum separation between temporal ordering values.
pub const DEFAULT_TEMPORAL_SPREAD: i64 = 16;
/// Default per-check solver timeout.
pub const DEFAULT_OPTIMIZATION_TIMEOUT: Duration = Duration::from_millis(8000);

/// Decimation tolerances in slicer units. Low precision decimates harder.
pub const DECIMATION_TOLERANCE_VALUE_UNDEFINED: f64 = 0.0;
pub const DECIMATION_TOLERANCE_VALUE_LOW: f64 = 150_000.0;
pub const DECIMATION_TOLERANCE_VALUE_HIGH: f64 = 450_000.0;

/// How aggressively input polygons are simplified before solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimationPrecision {
    /// No decimation; polygons only get orientation-normalised.
    Undefined,
    Low,
    High,
}

impl DecimationPrecision {
    /// Tolerance handed to the simplifier. Note the inversion: low precision
    /// means a high tolerance.
    pub fn tolerance(self) -> f64 {
        match self {
            DecimationPrecision::Undefined => DECIMATION_TOLERANCE_VALUE_UNDEFINED,
            DecimationPrecision::Low => DECIMATION_TOLERANCE_VALUE_HIGH,
            DecimationPrecision::High => DECIMATION_TOLERANCE_VALUE_LOW,
        }
    }
}

impl FromStr for DecimationPrecision {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "undefined" | "none" => Ok(Self::Undefined),
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            _ => Err(()),
        }
    }
}

/// Which constraint flavour the scheduler builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrangementMode {
    /// Temporal guards only; every object of an attempt participates.
    Sequential,
    /// Presence assumptions let an attempt mark objects as missing without
    /// rebuilding the formula.
    Consequential,
}

impl FromStr for ArrangementMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "consequential" => Ok(Self::Consequential),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfiguration {
    /// Step of the non-binary bounding box shrink loop, in bed units.
    pub bounding_box_size_optimization_step: i64,
    pub minimum_x_bounding_box_size: i64,
    pub minimum_y_bounding_box_size: i64,
    /// Bed extents in bed units (slicer units / 100000).
    pub maximum_x_bounding_box_size: i64,
    pub maximum_y_bounding_box_size: i64,
    /// Objects decided together by one solver group.
    pub object_group_size: usize,
    /// Minimum separation of temporal ordering values.
    pub temporal_spread: i64,
    #[serde(default = "default_decimation_precision")]
    pub decimation_precision: DecimationPrecision,
    #[serde(default = "default_mode")]
    pub mode: ArrangementMode,
    /// Per-check solver timeout; a timed out check counts as UNSAT.
    #[serde(default = "default_timeout")]
    pub optimization_timeout: Duration,

    /// Plate extents in solver units (slicer units / 50000), derived from the
    /// printer geometry.
    pub plate_bounding_box_size_x: i64,
    pub plate_bounding_box_size_y: i64,

    /// Assert the temporal lepox band for glued objects in consequential
    /// mode. Off by default.
    #[serde(default)]
    pub temporal_lepox_enabled: bool,
    /// Upper bound factor of the temporal lepox band.
    #[serde(default = "default_temporal_lepox_slack")]
    pub temporal_lepox_slack: f64,
}

impl Default for SolverConfiguration {
    fn default() -> Self {
        // MK3S-sized bed: 250 x 210 mm.
        Self {
            bounding_box_size_optimization_step: 4,
            minimum_x_bounding_box_size: MINIMUM_BOUNDING_BOX_SIZE,
            minimum_y_bounding_box_size: MINIMUM_BOUNDING_BOX_SIZE,
            maximum_x_bounding_box_size: 250,
            maximum_y_bounding_box_size: 210,
            object_group_size: DEFAULT_OBJECT_GROUP_SIZE,
            temporal_spread: DEFAULT_TEMPORAL_SPREAD,
            decimation_precision: default_decimation_precision(),
            mode: default_mode(),
            optimization_timeout: default_timeout(),
            plate_bounding_box_size_x: 500,
            plate_bounding_box_size_y: 420,
            temporal_lepox_enabled: false,
            temporal_lepox_slack: default_temporal_lepox_slack(),
        }
    }
}

fn default_decimation_precision() -> DecimationPrecision {
    DecimationPrecision::Low
}
fn default_mode() -> ArrangementMode {
    ArrangementMode::Consequential
}
fn default_timeout() -> Duration {
    DEFAULT_OPTIMIZATION_TIMEOUT
}
fn default_temporal_lepox_slack() -> f64 {
    1.5
}

impl SolverConfiguration {
    /// Configuration sized for the given printer geometry.
    pub fn from_printer_geometry(printer_geometry: &PrinterGeometry) -> Self {
        let mut cfg = Self::default();
        cfg.set_printer_geometry(printer_geometry);
        cfg
    }

    /// Recomputes every field derived from the printer geometry.
    pub fn set_printer_geometry(&mut self, printer_geometry: &PrinterGeometry) {
        self.maximum_x_bounding_box_size = printer_geometry.x_size / SLICER_SCALE_FACTOR;
        self.maximum_y_bounding_box_size = printer_geometry.y_size / SLICER_SCALE_FACTOR;
        self.plate_bounding_box_size_x = printer_geometry.x_size / SOLVER_SCALE_FACTOR;
        self.plate_bounding_box_size_y = printer_geometry.y_size / SOLVER_SCALE_FACTOR;
    }

    pub fn minimum_bounding_box_size(&self) -> i64 {
        self.minimum_x_bounding_box_size
            .min(self.minimum_y_bounding_box_size)
    }

    pub fn maximum_bounding_box_size(&self) -> i64 {
        self.maximum_x_bounding_box_size
            .max(self.maximum_y_bounding_box_size)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SeqArrangeError;

        if self.object_group_size == 0 {
            return Err(SeqArrangeError::InvalidConfig(
                "object_group_size must be at least 1".into(),
            ));
        }
        if self.temporal_spread <= 0 {
            return Err(SeqArrangeError::InvalidConfig(format!(
                "temporal_spread must be positive (got {})",
                self.temporal_spread
            )));
        }
        if self.plate_bounding_box_size_x <= 0 || self.plate_bounding_box_size_y <= 0 {
            return Err(SeqArrangeError::InvalidConfig(format!(
                "plate extents must be positive (got {}x{})",
                self.plate_bounding_box_size_x, self.plate_bounding_box_size_y
            )));
        }
        if self.minimum_x_bounding_box_size > self.maximum_x_bounding_box_size
            || self.minimum_y_bounding_box_size > self.maximum_y_bounding_box_size
        {
            return Err(SeqArrangeError::InvalidConfig(
                "minimum bounding box size exceeds the bed".into(),
            ));
        }
        if self.temporal_lepox_slack <= 1.0 {
            return Err(SeqArrangeError::InvalidConfig(format!(
                "temporal_lepox_slack must exceed 1.0 (got {})",
                self.temporal_lepox_slack
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `SolverConfiguration`.
    pub fn builder() -> SolverConfigurationBuilder {
        SolverConfigurationBuilder::new()
    }
}

/// Builder for `SolverConfiguration` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct SolverConfigurationBuilder {
    cfg: SolverConfiguration,
}

impl SolverConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            cfg: SolverConfiguration::default(),
        }
    }
    pub fn printer_geometry(mut self, pg: &PrinterGeometry) -> Self {
        self.cfg.set_printer_geometry(pg);
        self
    }
    pub fn object_group_size(mut self, v: usize) -> Self {
        self.cfg.object_group_size = v;
        self
    }
    pub fn temporal_spread(mut self, v: i64) -> Self {
        self.cfg.temporal_spread = v;
        self
    }
    pub fn decimation_precision(mut self, v: DecimationPrecision) -> Self {
        self.cfg.decimation_precision = v;
        self
    }
    pub fn mode(mut self, v: ArrangementMode) -> Self {
        self.cfg.mode = v;
        self
    }
    pub fn optimization_timeout(mut self, v: Duration) -> Self {
        self.cfg.optimization_timeout = v;
        self
    }
    pub fn temporal_lepox_enabled(mut self, v: bool) -> Self {
        self.cfg.temporal_lepox_enabled = v;
        self
    }
    pub fn temporal_lepox_slack(mut self, v: f64) -> Self {
        self.cfg.temporal_lepox_slack = v;
        self
    }
    pub fn build(self) -> SolverConfiguration {
        self.cfg
    }
}
