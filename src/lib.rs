//! Orbit Arbiter - step arbitration for two objects on precomputed paths
//!
//! Core modules:
//! - `sim`: Deterministic arbitration (trajectories, interference, tick, run loop)
//! - `settings`: Scenario and run configuration (JSON)
//! - `persistence`: JSON-lines export of trajectory tables and transition logs
//! - `clock`: Strictly increasing timestamps for transition records

pub mod clock;
pub mod error;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::{ArbiterError, Result};
pub use settings::{CurveKind, ObjectConfig, RunSettings, ScenarioConfig, TieBreak};

use glam::DVec2;

/// Object identity as carried in configs and transition records
pub type ObjectId = u32;

/// Arbitration constants
pub mod consts {
    /// Lookahead is judged safe while `min_separation / distance` stays below this
    pub const LOOKAHEAD_MARGIN: f64 = 2.0;
    /// Samples per object in the built-in demo scenario
    pub const DEMO_SPLITS: usize = 100;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Check that a scalar is a usable, finite, non-negative value
#[inline]
pub(crate) fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
