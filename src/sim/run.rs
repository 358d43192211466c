//! Run loop: drives the arbiter to completion and keeps the transition log

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::state::{Object, Side, SimulationState, Termination, TransitionRecord};
use super::tick::{StepArbiter, TickDecision, TickOutcome};
use crate::ObjectId;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::settings::RunSettings;

/// Delay strategy between ticks. Purely cosmetic.
pub trait Pacer {
    fn pause(&mut self);
}

/// No delay
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pause(&mut self) {}
}

/// Sleep the current thread for a fixed interval
#[derive(Debug, Clone, Copy)]
pub struct SleepPacing(pub Duration);

impl SleepPacing {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl Pacer for SleepPacing {
    fn pause(&mut self) {
        if !self.0.is_zero() {
            std::thread::sleep(self.0);
        }
    }
}

/// Per-object totals for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub object_id: ObjectId,
    pub name: String,
    pub final_step: usize,
    pub last_step: usize,
    pub advances: u64,
}

/// Decision counts for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub both_advanced: u64,
    pub preferred_advanced: u64,
    pub yielded: u64,
    pub objects: Vec<ObjectSummary>,
}

impl RunSummary {
    /// Ticks that took the interference branch
    pub fn interference_ticks(&self) -> u64 {
        self.preferred_advanced + self.yielded
    }

    fn count(&mut self, outcome: &TickOutcome) {
        match outcome.decision {
            TickDecision::BothAdvanced => self.both_advanced += 1,
            TickDecision::PreferredAdvanced { .. } => self.preferred_advanced += 1,
            TickDecision::Yielded { .. } => self.yielded += 1,
            TickDecision::Finished(_) | TickDecision::Idle => {}
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub termination: Termination,
    pub final_state: SimulationState,
    /// Initial placements (tick 0) followed by every advance, in order
    pub transitions: Vec<TransitionRecord>,
    pub summary: RunSummary,
}

/// Drives a [`StepArbiter`] tick by tick
pub struct RunLoop<'a, C: Clock, P: Pacer> {
    arbiter: StepArbiter<'a>,
    clock: C,
    pacer: P,
    max_ticks: Option<u64>,
    log: Vec<TransitionRecord>,
    summary: RunSummary,
}

impl<'a, C: Clock, P: Pacer> RunLoop<'a, C, P> {
    /// Set up a run; both objects are placed at step 0 and logged at tick 0
    pub fn new(a: &'a Object, b: &'a Object, settings: &RunSettings, mut clock: C, pacer: P) -> Result<Self> {
        let started_at = clock.now();
        let arbiter = StepArbiter::new(a, b, settings.tie_break, started_at)?;

        let mut log = Vec::with_capacity(a.trajectory.len() + b.trajectory.len());
        for side in Side::BOTH {
            let object = arbiter.object(side);
            let at = if side == Side::A { started_at } else { clock.now() };
            log.push(TransitionRecord::new(object.id, 0, object.position_at(0)?, at, 0));
        }

        log::info!(
            "Run start: object {} ({} samples, priority {}) vs object {} ({} samples, priority {})",
            a.id,
            a.trajectory.len(),
            a.priority,
            b.id,
            b.trajectory.len(),
            b.priority
        );

        Ok(Self {
            arbiter,
            clock,
            pacer,
            max_ticks: settings.max_ticks,
            log,
            summary: RunSummary::default(),
        })
    }

    pub fn state(&self) -> &SimulationState {
        self.arbiter.state()
    }

    pub fn log(&self) -> &[TransitionRecord] {
        &self.log
    }

    pub fn is_finished(&self) -> bool {
        self.arbiter.is_finished()
    }

    /// Run a single tick and append its records.
    ///
    /// Callers may stop between any two calls; state is consistent at tick
    /// boundaries.
    pub fn step(&mut self) -> Result<TickOutcome> {
        if let Some(limit) = self.max_ticks {
            if !self.is_finished() && self.state().tick >= limit {
                log::info!("Tick limit {} reached", limit);
                self.arbiter.halt(Termination::TickLimit { ticks: limit });
            }
        }

        let outcome = self.arbiter.tick(&mut self.clock)?;
        if outcome.decision != TickDecision::Idle {
            self.summary.ticks = outcome.tick;
        }
        self.summary.count(&outcome);
        self.log.extend(outcome.records.iter().cloned());
        Ok(outcome)
    }

    /// Tick until the run finishes
    pub fn run(mut self) -> Result<RunReport> {
        loop {
            let outcome = self.step()?;
            if outcome.is_terminal() {
                break;
            }
            self.pacer.pause();
        }
        Ok(self.finish())
    }

    fn finish(self) -> RunReport {
        let final_state = self.arbiter.state().clone();
        let termination = final_state
            .termination()
            .unwrap_or(Termination::TickLimit { ticks: final_state.tick });

        let mut summary = self.summary;
        summary.objects = Side::BOTH
            .into_iter()
            .map(|side| {
                let object = self.arbiter.object(side);
                ObjectSummary {
                    object_id: object.id,
                    name: object.name.clone(),
                    final_step: final_state.step(side),
                    last_step: object.last_step(),
                    advances: final_state.step(side) as u64,
                }
            })
            .collect();

        log::info!(
            "Run finished after {} ticks ({:?}): both={} preferred={} yielded={} records={}",
            summary.ticks,
            termination,
            summary.both_advanced,
            summary.preferred_advanced,
            summary.yielded,
            self.log.len()
        );

        RunReport {
            termination,
            final_state,
            transitions: self.log,
            summary,
        }
    }
}

/// Run a pair with the wall clock and the pacing from `settings`
pub fn run_pair(a: &Object, b: &Object, settings: &RunSettings) -> Result<RunReport> {
    let pacer = SleepPacing::from_millis(settings.pacing_ms);
    RunLoop::new(a, b, settings, SystemClock::new(), pacer)?.run()
}
