//! Precomputed periodic trajectories
//!
//! A trajectory is a finite, immutable sequence of 2-D samples indexed
//! `0..N-1`. Generated trajectories sample a parametric circle at `splits`
//! evenly spaced angles over `[0, 2π·cycles]`, both ends included.

use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{ArbiterError, Result};
use crate::settings::CurveKind;
use crate::{is_non_negative, polar_to_cartesian};

/// Inputs to trajectory generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryParams {
    pub center: DVec2,
    pub radius: f64,
    pub splits: usize,
    pub cycles: f64,
    pub curve: CurveKind,
}

impl TrajectoryParams {
    pub fn circle(center: DVec2, radius: f64, splits: usize, cycles: f64) -> Self {
        Self {
            center,
            radius,
            splits,
            cycles,
            curve: CurveKind::Circle,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.splits == 0 {
            return Err(ArbiterError::invalid("splits must be at least 1"));
        }
        if !self.center.is_finite() {
            return Err(ArbiterError::invalid("center must be finite"));
        }
        if !is_non_negative(self.radius) {
            return Err(ArbiterError::invalid(format!(
                "radius must be finite and non-negative, got {}",
                self.radius
            )));
        }
        if !is_non_negative(self.cycles) {
            return Err(ArbiterError::invalid(format!(
                "cycles must be finite and non-negative, got {}",
                self.cycles
            )));
        }
        Ok(())
    }

    /// Curve parameter for a step (same spacing as an inclusive linspace)
    pub fn theta_at(&self, step: usize) -> f64 {
        if self.splits <= 1 {
            return 0.0;
        }
        let stop = TAU * self.cycles;
        let delta = stop / (self.splits - 1) as f64;
        step as f64 * delta
    }

    /// Position on the curve at parameter `theta`
    pub fn point_at(&self, theta: f64) -> DVec2 {
        match self.curve {
            CurveKind::Circle => self.center + polar_to_cartesian(self.radius, theta),
            CurveKind::AngularRate => self.center + polar_to_cartesian(1.0, self.radius * theta),
        }
    }
}

/// Immutable sample sequence for one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryData")]
pub struct Trajectory {
    points: Vec<DVec2>,
    /// Generation inputs, absent for trajectories built from raw points
    params: Option<TrajectoryParams>,
}

impl Trajectory {
    /// Sample the parametric curve described by `params`
    pub fn generate(params: &TrajectoryParams) -> Result<Self> {
        params.validate()?;
        let points = (0..params.splits)
            .map(|step| params.point_at(params.theta_at(step)))
            .collect();
        Ok(Self {
            points,
            params: Some(*params),
        })
    }

    /// Wrap an externally generated sequence
    pub fn from_points(points: Vec<DVec2>) -> Result<Self> {
        if points.is_empty() {
            return Err(ArbiterError::invalid("trajectory must have at least one sample"));
        }
        if let Some(step) = points.iter().position(|p| !p.is_finite()) {
            return Err(ArbiterError::invalid(format!(
                "trajectory sample {} is not finite",
                step
            )));
        }
        Ok(Self {
            points,
            params: None,
        })
    }

    /// Number of samples (always at least 1)
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: empty trajectories are rejected at construction
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn contains_step(&self, step: usize) -> bool {
        step < self.points.len()
    }

    /// Position at `step`, failing outside `[0, N-1]`
    pub fn position_at(&self, step: usize) -> Result<DVec2> {
        self.points.get(step).copied().ok_or(ArbiterError::OutOfRange {
            step,
            len: self.points.len(),
        })
    }

    /// Curve parameter at `step` (generated trajectories only)
    pub fn theta_at(&self, step: usize) -> Option<f64> {
        self.params
            .filter(|_| self.contains_step(step))
            .map(|p| p.theta_at(step))
    }

    pub fn params(&self) -> Option<&TrajectoryParams> {
        self.params.as_ref()
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }
}

/// Unchecked wire form; deserialized trajectories pass the same checks as
/// `from_points` and `generate`
#[derive(Deserialize)]
struct TrajectoryData {
    points: Vec<DVec2>,
    #[serde(default)]
    params: Option<TrajectoryParams>,
}

impl TryFrom<TrajectoryData> for Trajectory {
    type Error = ArbiterError;

    fn try_from(data: TrajectoryData) -> Result<Self> {
        let mut trajectory = Trajectory::from_points(data.points)?;
        if let Some(params) = data.params {
            params.validate()?;
            if params.splits != trajectory.len() {
                return Err(ArbiterError::invalid(format!(
                    "trajectory has {} samples but its parameters call for {}",
                    trajectory.len(),
                    params.splits
                )));
            }
            trajectory.params = Some(params);
        }
        Ok(trajectory)
    }
}
