//! Scenario and run configuration
//!
//! A scenario file is JSON. Two layouts are accepted:
//!
//! ```json
//! { "objects": { "obj1": { ... }, "obj2": { ... } }, "settings": { "pacing_ms": 100 } }
//! ```
//!
//! or the bare object map used by older trajectory generators, with their
//! field names (`x_center`, `priority_no`, `group_no`, `barrier_range`):
//!
//! ```json
//! { "obj1": { "id": 1, "x_center": 0.0, "y_center": 0.0, "radius": 2.0, ... } }
//! ```
//!
//! An object's center is either `"center": [x, y]` or the `x_center` /
//! `y_center` pair, never both.

use std::collections::BTreeMap;
use std::path::Path;

use clap::ValueEnum;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{ArbiterError, Result};
use crate::is_non_negative;
use crate::sim::{Object, Trajectory, TrajectoryParams};
use crate::ObjectId;

/// How two objects with equal priority are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The object with the lower id takes precedence
    #[default]
    LowerId,
    /// Equal priorities are a configuration error
    Reject,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::LowerId => "lower-id",
            TieBreak::Reject => "reject",
        }
    }
}

/// Parametric curve used to sample a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CurveKind {
    /// `center + radius * (cos θ, sin θ)`
    #[default]
    Circle,
    /// `center + (cos(radius * θ), sin(radius * θ))`: unit circle, `radius`
    /// acts as an angular rate
    AngularRate,
}

/// One object as described in a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObjectConfigData")]
pub struct ObjectConfig {
    pub id: ObjectId,
    pub name: String,
    pub center: DVec2,
    pub radius: f64,
    pub splits: usize,
    pub cycles: f64,
    pub priority: u32,
    pub group: u32,
    pub safety_radius: f64,
    pub curve: CurveKind,
}

/// Scenario file form of an object, before the center is resolved
#[derive(Deserialize)]
struct ObjectConfigData {
    id: ObjectId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    center: Option<DVec2>,
    #[serde(default)]
    x_center: Option<f64>,
    #[serde(default)]
    y_center: Option<f64>,
    radius: f64,
    splits: usize,
    cycles: f64,
    #[serde(alias = "priority_no")]
    priority: u32,
    #[serde(alias = "group_no", default)]
    group: u32,
    #[serde(alias = "barrier_range")]
    safety_radius: f64,
    #[serde(default)]
    curve: CurveKind,
}

impl TryFrom<ObjectConfigData> for ObjectConfig {
    type Error = ArbiterError;

    fn try_from(data: ObjectConfigData) -> Result<Self> {
        let center = match (data.center, data.x_center, data.y_center) {
            (Some(center), None, None) => center,
            (None, Some(x), Some(y)) => DVec2::new(x, y),
            (None, _, _) => {
                return Err(ArbiterError::invalid(format!(
                    "object {}: needs `center` or both `x_center` and `y_center`",
                    data.id
                )));
            }
            (Some(_), _, _) => {
                return Err(ArbiterError::invalid(format!(
                    "object {}: `center` cannot be combined with `x_center`/`y_center`",
                    data.id
                )));
            }
        };
        Ok(Self {
            id: data.id,
            name: data.name,
            center,
            radius: data.radius,
            splits: data.splits,
            cycles: data.cycles,
            priority: data.priority,
            group: data.group,
            safety_radius: data.safety_radius,
            curve: data.curve,
        })
    }
}

impl ObjectConfig {
    pub fn trajectory_params(&self) -> TrajectoryParams {
        TrajectoryParams {
            center: self.center,
            radius: self.radius,
            splits: self.splits,
            cycles: self.cycles,
            curve: self.curve,
        }
    }

    /// Generate the trajectory and build the immutable object
    pub fn build(&self) -> Result<Object> {
        if !is_non_negative(self.safety_radius) {
            return Err(ArbiterError::invalid(format!(
                "object {}: safety radius must be finite and non-negative, got {}",
                self.id, self.safety_radius
            )));
        }
        let trajectory = Trajectory::generate(&self.trajectory_params()).map_err(|e| match e {
            ArbiterError::InvalidConfiguration(msg) => {
                ArbiterError::invalid(format!("object {}: {}", self.id, msg))
            }
            other => other,
        })?;
        Object::new(
            self.id,
            self.name.clone(),
            self.priority,
            self.group,
            self.safety_radius,
            trajectory,
        )
    }
}

/// Knobs for a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Ranking policy for equal priorities
    pub tie_break: TieBreak,
    /// Cosmetic delay between ticks (0 = none)
    pub pacing_ms: u64,
    /// Stop after this many ticks even if no trajectory is exhausted
    pub max_ticks: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::LowerId,
            pacing_ms: 0,
            max_ticks: None,
        }
    }
}

/// A complete scenario: the objects to arbitrate and how to run them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub objects: BTreeMap<String, ObjectConfig>,
    #[serde(default)]
    pub settings: RunSettings,
}

impl ScenarioConfig {
    /// Parse either the wrapped layout or a bare object map
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let wrapped = value
            .as_object()
            .map(|map| map.contains_key("objects"))
            .unwrap_or(false);

        let mut scenario = if wrapped {
            serde_json::from_value::<ScenarioConfig>(value)?
        } else {
            let objects = serde_json::from_value::<BTreeMap<String, ObjectConfig>>(value)?;
            ScenarioConfig {
                objects,
                settings: RunSettings::default(),
            }
        };

        // Unnamed objects take their map key
        for (key, object) in scenario.objects.iter_mut() {
            if object.name.is_empty() {
                object.name = key.clone();
            }
        }

        log::info!("Loaded scenario with {} objects", scenario.objects.len());
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::info!("Reading scenario from {}", path.display());
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build every object, sorted by id
    pub fn build_objects(&self) -> Result<Vec<Object>> {
        let mut objects = self
            .objects
            .values()
            .map(ObjectConfig::build)
            .collect::<Result<Vec<_>>>()?;
        objects.sort_by_key(|o| o.id);

        if let Some(w) = objects.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(ArbiterError::invalid(format!(
                "duplicate object id {}",
                w[0].id
            )));
        }
        Ok(objects)
    }

    /// Build the pair to arbitrate; arbitration is pairwise, so exactly two
    /// objects are required
    pub fn build_pair(&self) -> Result<(Object, Object)> {
        let mut objects = self.build_objects()?;
        if objects.len() != 2 {
            return Err(ArbiterError::invalid(format!(
                "a scenario must describe exactly two objects, found {}",
                objects.len()
            )));
        }
        let b = objects.pop();
        let a = objects.pop();
        match (a, b) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(ArbiterError::invalid("scenario pair is incomplete")),
        }
    }

    /// Two-object demo: overlapping circles that force arbitration
    pub fn demo() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(
            "obj1".to_string(),
            ObjectConfig {
                id: 1,
                name: "obj1".to_string(),
                center: DVec2::ZERO,
                radius: 2.0,
                splits: crate::consts::DEMO_SPLITS,
                cycles: 1.0,
                priority: 1,
                group: 1,
                safety_radius: 1.5,
                curve: CurveKind::Circle,
            },
        );
        objects.insert(
            "obj2".to_string(),
            ObjectConfig {
                id: 2,
                name: "obj2".to_string(),
                center: DVec2::ONE,
                radius: 1.0,
                splits: crate::consts::DEMO_SPLITS,
                cycles: 2.0,
                priority: 2,
                group: 1,
                safety_radius: 1.5,
                curve: CurveKind::Circle,
            },
        );
        Self {
            objects,
            settings: RunSettings::default(),
        }
    }
}
