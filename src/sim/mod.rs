//! Deterministic arbitration module
//!
//! All decision logic lives here. This module must stay pure and
//! deterministic:
//! - Discrete ticks only, no continuous collision checks
//! - Objects and trajectories are immutable once built
//! - `SimulationState` is mutated by the arbiter alone
//! - Timestamps come from an injected clock, pacing from an injected pacer

pub mod interference;
pub mod run;
pub mod state;
pub mod tick;
pub mod trajectory;

pub use interference::{Separation, distance, lookahead_is_safe, min_separation};
pub use run::{NoPacing, ObjectSummary, Pacer, RunLoop, RunReport, RunSummary, SleepPacing, run_pair};
pub use state::{Cursor, Object, RunPhase, Side, SimulationState, Termination, TransitionRecord};
pub use tick::{StepArbiter, TickDecision, TickOutcome};
pub use trajectory::{Trajectory, TrajectoryParams};
