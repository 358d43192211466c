//! Objects, run state and transition records
//!
//! Objects and their trajectories are immutable once built. `SimulationState`
//! holds exactly one current step per object and is only mutated by the
//! arbiter.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::trajectory::Trajectory;
use crate::clock::Timestamp;
use crate::error::{ArbiterError, Result};
use crate::{ObjectId, is_non_negative};

/// A moving object with a precomputed path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObjectData")]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
    /// Lower value takes precedence
    pub priority: u32,
    pub group: u32,
    /// Personal clearance contribution ("barrier range")
    pub safety_radius: f64,
    pub trajectory: Trajectory,
}

impl Object {
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        priority: u32,
        group: u32,
        safety_radius: f64,
        trajectory: Trajectory,
    ) -> Result<Self> {
        if !is_non_negative(safety_radius) {
            return Err(ArbiterError::invalid(format!(
                "object {}: safety radius must be finite and non-negative, got {}",
                id, safety_radius
            )));
        }
        if trajectory.is_empty() {
            return Err(ArbiterError::invalid(format!(
                "object {}: trajectory is empty",
                id
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            priority,
            group,
            safety_radius,
            trajectory,
        })
    }

    /// Position at `step`, failing with `OutOfRange` outside the trajectory
    #[inline]
    pub fn position_at(&self, step: usize) -> Result<DVec2> {
        self.trajectory.position_at(step)
    }

    #[inline]
    pub fn last_step(&self) -> usize {
        self.trajectory.last_index()
    }
}

#[derive(Deserialize)]
struct ObjectData {
    id: ObjectId,
    name: String,
    priority: u32,
    group: u32,
    safety_radius: f64,
    trajectory: Trajectory,
}

impl TryFrom<ObjectData> for Object {
    type Error = ArbiterError;

    fn try_from(data: ObjectData) -> Result<Self> {
        Object::new(
            data.id,
            data.name,
            data.priority,
            data.group,
            data.safety_radius,
            data.trajectory,
        )
    }
}

/// Which member of the arbitrated pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Where one object currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub step: usize,
    pub last_advanced_at: Timestamp,
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// An object was due to advance past its last sample
    Exhausted { object_id: ObjectId, step: usize },
    /// The caller's tick limit was reached
    TickLimit { ticks: u64 },
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Running,
    Finished(Termination),
}

/// Mutable state of one arbitration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Ticks evaluated so far
    pub tick: u64,
    /// When the run started (initial `last_advanced_at` of both objects)
    pub started_at: Timestamp,
    cursors: [Cursor; 2],
    phase: RunPhase,
}

impl SimulationState {
    pub fn new(started_at: Timestamp) -> Self {
        let cursor = Cursor {
            step: 0,
            last_advanced_at: started_at,
        };
        Self {
            tick: 0,
            started_at,
            cursors: [cursor; 2],
            phase: RunPhase::Running,
        }
    }

    #[inline]
    pub fn cursor(&self, side: Side) -> Cursor {
        self.cursors[side.index()]
    }

    #[inline]
    pub fn step(&self, side: Side) -> usize {
        self.cursors[side.index()].step
    }

    /// `(current_step[A], current_step[B])`
    pub fn steps(&self) -> (usize, usize) {
        (self.step(Side::A), self.step(Side::B))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RunPhase::Finished(_))
    }

    pub fn termination(&self) -> Option<Termination> {
        match self.phase {
            RunPhase::Finished(t) => Some(t),
            RunPhase::Running => None,
        }
    }

    /// Move one object to its next step
    pub(super) fn advance(&mut self, side: Side, at: Timestamp) -> usize {
        let cursor = &mut self.cursors[side.index()];
        cursor.step += 1;
        cursor.last_advanced_at = at;
        cursor.step
    }

    pub(super) fn finish(&mut self, termination: Termination) {
        if !self.is_finished() {
            self.phase = RunPhase::Finished(termination);
        }
    }
}

/// One entry of the append-only transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub object_id: ObjectId,
    pub step: usize,
    pub x: f64,
    pub y: f64,
    /// Unique per record
    pub timestamp: Timestamp,
    /// Tick that produced the record (0 = initial placement)
    pub tick: u64,
}

impl TransitionRecord {
    pub fn new(object_id: ObjectId, step: usize, pos: DVec2, timestamp: Timestamp, tick: u64) -> Self {
        Self {
            object_id,
            step,
            x: pos.x,
            y: pos.y,
            timestamp,
            tick,
        }
    }

    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Record contents without the timestamp, for replay comparisons
    pub fn key(&self) -> (ObjectId, usize, u64, u64, u64) {
        (self.object_id, self.step, self.x.to_bits(), self.y.to_bits(), self.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_zero() {
        let state = SimulationState::new(Timestamp(42));
        assert_eq!(state.steps(), (0, 0));
        assert_eq!(state.tick, 0);
        assert_eq!(state.cursor(Side::B).last_advanced_at, Timestamp(42));
        assert_eq!(state.phase(), RunPhase::Running);
        assert_eq!(state.termination(), None);
    }

    #[test]
    fn test_advance_moves_one_cursor() {
        let mut state = SimulationState::new(Timestamp(0));
        assert_eq!(state.advance(Side::B, Timestamp(5)), 1);
        assert_eq!(state.steps(), (0, 1));
        assert_eq!(state.cursor(Side::B).last_advanced_at, Timestamp(5));
        assert_eq!(state.cursor(Side::A).last_advanced_at, Timestamp(0));
    }

    #[test]
    fn test_finish_is_sticky() {
        let mut state = SimulationState::new(Timestamp(0));
        state.finish(Termination::Exhausted { object_id: 1, step: 3 });
        state.finish(Termination::TickLimit { ticks: 9 });
        assert_eq!(
            state.termination(),
            Some(Termination::Exhausted { object_id: 1, step: 3 })
        );
    }

    #[test]
    fn test_object_rejects_bad_radius() {
        let traj = Trajectory::from_points(vec![DVec2::ZERO]).unwrap();
        assert!(Object::new(1, "a", 1, 0, -1.0, traj.clone()).is_err());
        assert!(Object::new(1, "a", 1, 0, f64::NAN, traj.clone()).is_err());
        assert!(Object::new(1, "a", 1, 0, 0.0, traj).is_ok());
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let object = Object::new(3, "c", 1, 0, 0.5, Trajectory::from_points(vec![DVec2::ONE]).unwrap()).unwrap();
        let json = serde_json::to_string(&object).unwrap();
        assert_eq!(serde_json::from_str::<Object>(&json).unwrap(), object);

        let negative = r#"{"id":3,"name":"c","priority":1,"group":0,"safety_radius":-3.0,
            "trajectory":{"points":[[0.0,0.0]],"params":null}}"#;
        assert!(serde_json::from_str::<Object>(negative).is_err());

        let empty = r#"{"id":3,"name":"c","priority":1,"group":0,"safety_radius":1.0,
            "trajectory":{"points":[],"params":null}}"#;
        assert!(serde_json::from_str::<Object>(empty).is_err());
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::A.other(), Side::B);
        assert_eq!(Side::B.other().index(), 0);
    }
}
