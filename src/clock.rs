//! Timestamps for transition records
//!
//! Every record handed to the log must carry a distinct timestamp, so clocks
//! here are strictly increasing: two calls to [`Clock::now`] never return the
//! same value.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Microseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Smallest timestamp strictly after this one
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}

/// Source of strictly increasing timestamps
pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

/// Wall clock, bumped by one microsecond whenever the system clock has not
/// moved (or moved backwards) since the previous call
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Option<Timestamp>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { last: None }
    }

    fn wall() -> Timestamp {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Timestamp(micros)
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Timestamp {
        let wall = Self::wall();
        let ts = match self.last {
            Some(last) if wall <= last => last.next(),
            _ => wall,
        };
        self.last = Some(ts);
        ts
    }
}

/// Deterministic clock for tests and replays: starts at `start` and moves
/// forward by `step` microseconds per call
#[derive(Debug, Clone)]
pub struct ManualClock {
    next: u64,
    step: u64,
}

impl ManualClock {
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            next: start,
            step: step.max(1),
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Timestamp {
        let ts = Timestamp(self.next);
        self.next = self.next.saturating_add(self.step);
        ts
    }
}
