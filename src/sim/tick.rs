//! Step arbitration tick
//!
//! Each tick reads both current positions and decides which object(s) move
//! one sample forward:
//!
//! 1. No interference (`min_separation < distance`): both advance.
//! 2. Interference: only one advances. The preferred object looks one sample
//!    ahead; if `min_separation / lookahead_distance < 2` it advances,
//!    otherwise the other object advances for this tick and the decision is
//!    re-evaluated from scratch next tick.
//!
//! An attempted advance past the last sample finishes the run.

use serde::{Deserialize, Serialize};

use super::interference::{Separation, distance, lookahead_is_safe};
use super::state::{Object, Side, SimulationState, Termination, TransitionRecord};
use crate::ObjectId;
use crate::clock::{Clock, Timestamp};
use crate::error::{ArbiterError, Result};
use crate::settings::TieBreak;

/// What a tick decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickDecision {
    /// No interference, both objects advanced
    BothAdvanced,
    /// Interference, the preferred object's lookahead was safe and it advanced
    PreferredAdvanced { object_id: ObjectId },
    /// Interference, the lookahead was unsafe and the other object advanced
    Yielded {
        preferred_id: ObjectId,
        advanced_id: ObjectId,
    },
    /// The run finished on this tick
    Finished(Termination),
    /// The run had already finished; nothing was evaluated
    Idle,
}

/// Everything a single tick produced
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub decision: TickDecision,
    /// Separation at the start of the tick (None when idle)
    pub separation: Option<Separation>,
    /// Records for every step advanced, in advance order
    pub records: Vec<TransitionRecord>,
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self.decision, TickDecision::Finished(_) | TickDecision::Idle)
    }
}

/// Arbitration state machine over one pair of objects
#[derive(Debug, Clone)]
pub struct StepArbiter<'a> {
    pair: [&'a Object; 2],
    preferred: Side,
    state: SimulationState,
}

impl<'a> StepArbiter<'a> {
    /// Validate the pair and rank it.
    ///
    /// Lower priority value wins; ties follow `tie_break`.
    pub fn new(a: &'a Object, b: &'a Object, tie_break: TieBreak, started_at: Timestamp) -> Result<Self> {
        if a.id == b.id {
            return Err(ArbiterError::invalid(format!(
                "cannot arbitrate object {} against itself",
                a.id
            )));
        }
        let preferred = match a.priority.cmp(&b.priority) {
            std::cmp::Ordering::Less => Side::A,
            std::cmp::Ordering::Greater => Side::B,
            std::cmp::Ordering::Equal => match tie_break {
                TieBreak::LowerId if a.id < b.id => Side::A,
                TieBreak::LowerId => Side::B,
                TieBreak::Reject => {
                    return Err(ArbiterError::invalid(format!(
                        "objects {} and {} share priority {}",
                        a.id, b.id, a.priority
                    )));
                }
            },
        };
        log::debug!(
            "Arbiter: object {} preferred over object {}",
            [a, b][preferred.index()].id,
            [a, b][preferred.other().index()].id
        );
        Ok(Self {
            pair: [a, b],
            preferred,
            state: SimulationState::new(started_at),
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn object(&self, side: Side) -> &'a Object {
        self.pair[side.index()]
    }

    /// Side of the higher-precedence object
    pub fn preferred(&self) -> Side {
        self.preferred
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Current position of one object
    pub fn position(&self, side: Side) -> Result<glam::DVec2> {
        self.object(side).position_at(self.state.step(side))
    }

    /// Stop the run at a tick boundary
    pub fn halt(&mut self, termination: Termination) {
        self.state.finish(termination);
    }

    /// Evaluate one tick
    pub fn tick(&mut self, clock: &mut impl Clock) -> Result<TickOutcome> {
        if self.state.is_finished() {
            return Ok(TickOutcome {
                tick: self.state.tick,
                decision: TickDecision::Idle,
                separation: None,
                records: Vec::new(),
            });
        }

        self.state.tick += 1;
        let tick = self.state.tick;

        let positions = [self.position(Side::A)?, self.position(Side::B)?];
        let separation = Separation::between(
            self.object(Side::A),
            positions[0],
            self.object(Side::B),
            positions[1],
        );

        if !separation.interferes() {
            if let Some(side) = Side::BOTH.into_iter().find(|s| !self.can_advance(*s)) {
                return Ok(self.exhaust(side, separation));
            }
            let records = vec![self.advance(Side::A, clock)?, self.advance(Side::B, clock)?];
            log::debug!(
                "Tick {}: clear (d={:.4}, m={:.4}), both advanced to {:?}",
                tick,
                separation.distance,
                separation.min_separation,
                self.state.steps()
            );
            return Ok(TickOutcome {
                tick,
                decision: TickDecision::BothAdvanced,
                separation: Some(separation),
                records,
            });
        }

        let p = self.preferred;
        let q = p.other();
        if !self.can_advance(p) {
            return Ok(self.exhaust(p, separation));
        }

        let lookahead = self.object(p).position_at(self.state.step(p) + 1)?;
        let lookahead_distance = distance(lookahead, positions[q.index()]);

        if lookahead_is_safe(separation.min_separation, lookahead_distance) {
            let record = self.advance(p, clock)?;
            log::debug!(
                "Tick {}: interference (d={:.4}, m={:.4}), lookahead d'={:.4} safe, object {} advanced",
                tick,
                separation.distance,
                separation.min_separation,
                lookahead_distance,
                record.object_id
            );
            return Ok(TickOutcome {
                tick,
                decision: TickDecision::PreferredAdvanced {
                    object_id: record.object_id,
                },
                separation: Some(separation),
                records: vec![record],
            });
        }

        // The lower-precedence object moves instead. Its new position is not
        // re-checked against the preferred object.
        if !self.can_advance(q) {
            return Ok(self.exhaust(q, separation));
        }
        let record = self.advance(q, clock)?;
        log::warn!(
            "Tick {}: lookahead d'={:.4} unsafe for object {} (m={:.4}), yielding to object {}",
            tick,
            lookahead_distance,
            self.object(p).id,
            separation.min_separation,
            record.object_id
        );
        Ok(TickOutcome {
            tick,
            decision: TickDecision::Yielded {
                preferred_id: self.object(p).id,
                advanced_id: record.object_id,
            },
            separation: Some(separation),
            records: vec![record],
        })
    }

    fn can_advance(&self, side: Side) -> bool {
        self.state.step(side) < self.object(side).last_step()
    }

    fn advance(&mut self, side: Side, clock: &mut impl Clock) -> Result<TransitionRecord> {
        let object = self.object(side);
        let next = self.state.step(side) + 1;
        let pos = object.position_at(next)?;
        let at = clock.now();
        self.state.advance(side, at);
        Ok(TransitionRecord::new(object.id, next, pos, at, self.state.tick))
    }

    fn exhaust(&mut self, side: Side, separation: Separation) -> TickOutcome {
        let termination = Termination::Exhausted {
            object_id: self.object(side).id,
            step: self.state.step(side),
        };
        self.state.finish(termination);
        log::debug!(
            "Tick {}: object {} exhausted at step {}",
            self.state.tick,
            self.object(side).id,
            self.state.step(side)
        );
        TickOutcome {
            tick: self.state.tick,
            decision: TickDecision::Finished(termination),
            separation: Some(separation),
            records: Vec::new(),
        }
    }
}
