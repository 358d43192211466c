//! End-to-end arbitration runs: fixed scenarios and randomized properties

use glam::DVec2;
use proptest::prelude::*;

use orbit_arbiter::persistence::{read_transition_log, write_transition_log};
use orbit_arbiter::sim::{
    NoPacing, Object, RunLoop, Side, TickDecision, TickOutcome, Termination, Trajectory, TrajectoryParams,
};
use orbit_arbiter::{ArbiterError, ManualClock, RunSettings, ScenarioConfig, TieBreak};

fn circle(id: u32, priority: u32, center: (f64, f64), radius: f64, splits: usize, safety_radius: f64) -> Object {
    let params = TrajectoryParams::circle(DVec2::new(center.0, center.1), radius, splits, 1.0);
    let trajectory = Trajectory::generate(&params).unwrap();
    Object::new(id, format!("obj{}", id), priority, 1, safety_radius, trajectory).unwrap()
}

/// Drive a run tick by tick, collecting every outcome
fn drive(a: &Object, b: &Object, settings: &RunSettings) -> (Vec<TickOutcome>, Vec<(usize, usize)>) {
    let mut run = RunLoop::new(a, b, settings, ManualClock::default(), NoPacing).unwrap();
    let mut outcomes = Vec::new();
    let mut steps = vec![run.state().steps()];
    // Generous guard: a correct run ends well before this
    let guard = a.trajectory.len() + b.trajectory.len() + 4;
    for _ in 0..guard {
        let outcome = run.step().unwrap();
        steps.push(run.state().steps());
        let done = outcome.is_terminal();
        outcomes.push(outcome);
        if done {
            break;
        }
    }
    assert!(run.is_finished(), "run did not terminate within {} ticks", guard);
    (outcomes, steps)
}

#[test]
fn test_disjoint_circles_never_interfere() {
    let a = circle(1, 1, (0.0, 0.0), 2.0, 50, 0.0);
    let b = circle(2, 2, (10.0, 10.0), 1.0, 80, 0.0);
    let report = RunLoop::new(&a, &b, &RunSettings::default(), ManualClock::default(), NoPacing)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.summary.interference_ticks(), 0);
    assert_eq!(report.summary.both_advanced, 49);
    assert_eq!(report.final_state.steps(), (49, 49));
    assert_eq!(report.termination, Termination::Exhausted { object_id: 1, step: 49 });
}

#[test]
fn test_overlapping_circles_interfere_on_first_tick() {
    let a = circle(1, 1, (0.0, 0.0), 2.0, 100, 1.5);
    let b = circle(2, 2, (1.0, 1.0), 1.0, 100, 1.5);
    let mut run = RunLoop::new(&a, &b, &RunSettings::default(), ManualClock::default(), NoPacing).unwrap();

    let outcome = run.step().unwrap();
    let sep = outcome.separation.unwrap();
    assert!((sep.min_separation - 3.0).abs() < 1e-12);
    assert!(sep.interferes());
    assert!(matches!(
        outcome.decision,
        TickDecision::PreferredAdvanced { .. } | TickDecision::Yielded { .. }
    ));
    assert_eq!(outcome.records.len(), 1);
    let (sa, sb) = run.state().steps();
    assert_eq!(sa + sb, 1);
}

#[test]
fn test_overlapping_circles_yield_when_lookahead_too_close() {
    // A's first sample moves to ~(1.996, 0.127), d' ~ 0.87 to B at (2, 1): 3 / 0.87 >= 2
    let a = circle(1, 1, (0.0, 0.0), 2.0, 100, 1.5);
    let b = circle(2, 2, (1.0, 1.0), 1.0, 100, 1.5);
    let mut run = RunLoop::new(&a, &b, &RunSettings::default(), ManualClock::default(), NoPacing).unwrap();
    let outcome = run.step().unwrap();
    assert_eq!(
        outcome.decision,
        TickDecision::Yielded {
            preferred_id: 1,
            advanced_id: 2
        }
    );
    assert_eq!(run.state().steps(), (0, 1));
}

#[test]
fn test_equal_priority_lower_id_wins() {
    // Interfering, and the preferred object's lookahead is safe
    let a = Object::new(
        2,
        "second",
        1,
        0,
        0.5,
        Trajectory::from_points(vec![DVec2::ZERO, DVec2::new(-1.0, 0.0)]).unwrap(),
    )
    .unwrap();
    let b = Object::new(
        1,
        "first",
        1,
        0,
        0.5,
        Trajectory::from_points(vec![DVec2::new(1.0, 0.0), DVec2::new(2.0, 0.0)]).unwrap(),
    )
    .unwrap();

    let mut run = RunLoop::new(&a, &b, &RunSettings::default(), ManualClock::default(), NoPacing).unwrap();
    let outcome = run.step().unwrap();
    assert_eq!(outcome.decision, TickDecision::PreferredAdvanced { object_id: 1 });
    assert_eq!(run.state().step(Side::B), 1);
    assert_eq!(run.state().step(Side::A), 0);

    let settings = RunSettings {
        tie_break: TieBreak::Reject,
        ..Default::default()
    };
    let result = RunLoop::new(&a, &b, &settings, ManualClock::default(), NoPacing);
    assert!(matches!(result, Err(ArbiterError::InvalidConfiguration(_))));
}

#[test]
fn test_legacy_scenario_end_to_end() {
    let json = r#"{
        "obj1": {"id": 1, "name": "obj1", "x_center": 0, "y_center": 0, "radius": 2,
                 "splits": 100, "cycles": 1, "priority_no": 1, "group_no": 1,
                 "barrier_range": 1.5, "curve": "angular-rate"},
        "obj2": {"id": 2, "name": "obj2", "x_center": 1, "y_center": 1, "radius": 1,
                 "splits": 100, "cycles": 1, "priority_no": 2, "group_no": 1,
                 "barrier_range": 1.5, "curve": "angular-rate"}
    }"#;
    let scenario = ScenarioConfig::from_json_str(json).unwrap();
    let (a, b) = scenario.build_pair().unwrap();
    let report = RunLoop::new(&a, &b, &scenario.settings, ManualClock::default(), NoPacing)
        .unwrap()
        .run()
        .unwrap();

    assert!(matches!(report.termination, Termination::Exhausted { .. }));
    assert!(report.summary.interference_ticks() > 0);

    let mut buf = Vec::new();
    let written = write_transition_log(&mut buf, &[&a, &b], &report.transitions).unwrap();
    assert_eq!(written, report.transitions.len());
    let rows = read_transition_log(buf.as_slice()).unwrap();
    assert_eq!(rows.len(), report.transitions.len());
    for (row, record) in rows.iter().zip(&report.transitions) {
        assert_eq!(row.object_id, record.object_id);
        assert_eq!(row.step, record.step);
        assert_eq!(row.timestamp, record.timestamp);
    }
}

#[test]
fn test_demo_scenario_runs() {
    let scenario = ScenarioConfig::demo();
    let (a, b) = scenario.build_pair().unwrap();
    let (outcomes, _) = drive(&a, &b, &scenario.settings);
    assert!(outcomes.len() <= a.trajectory.len() + b.trajectory.len());
}

fn arb_object(id: u32) -> impl Strategy<Value = Object> {
    (
        -5.0..5.0f64,
        -5.0..5.0f64,
        0.0..3.0f64,
        1usize..40,
        0.25..3.0f64,
        0u32..3,
        0.0..2.0f64,
    )
        .prop_map(move |(cx, cy, radius, splits, cycles, priority, safety_radius)| {
            let params = TrajectoryParams::circle(DVec2::new(cx, cy), radius, splits, cycles);
            let trajectory = Trajectory::generate(&params).unwrap();
            Object::new(id, format!("obj{}", id), priority, 0, safety_radius, trajectory).unwrap()
        })
}

proptest! {
    #[test]
    fn prop_interference_moves_at_most_one(a in arb_object(1), b in arb_object(2)) {
        let (outcomes, _) = drive(&a, &b, &RunSettings::default());
        for outcome in &outcomes {
            if let Some(sep) = outcome.separation {
                if sep.interferes() {
                    prop_assert!(outcome.records.len() <= 1);
                }
            }
            if outcome.decision == TickDecision::BothAdvanced {
                prop_assert!(!outcome.separation.unwrap().interferes());
            }
        }
    }

    #[test]
    fn prop_steps_monotonic_by_one(a in arb_object(1), b in arb_object(2)) {
        let (_, steps) = drive(&a, &b, &RunSettings::default());
        for w in steps.windows(2) {
            let (a0, b0) = w[0];
            let (a1, b1) = w[1];
            prop_assert!(a1 == a0 || a1 == a0 + 1);
            prop_assert!(b1 == b0 || b1 == b0 + 1);
            prop_assert!(a1 <= a.last_step());
            prop_assert!(b1 <= b.last_step());
        }
    }

    #[test]
    fn prop_terminates_within_bound(a in arb_object(1), b in arb_object(2)) {
        let (outcomes, _) = drive(&a, &b, &RunSettings::default());
        let n = a.trajectory.len().max(b.trajectory.len());
        prop_assert!(outcomes.len() <= 2 * n);
        let finished_exhausted = matches!(
            outcomes.last().map(|o| o.decision),
            Some(TickDecision::Finished(Termination::Exhausted { .. }))
        );
        prop_assert!(finished_exhausted);
    }

    #[test]
    fn prop_replay_is_identical(a in arb_object(1), b in arb_object(2)) {
        let run = |clock: ManualClock| {
            RunLoop::new(&a, &b, &RunSettings::default(), clock, NoPacing)
                .unwrap()
                .run()
                .unwrap()
        };
        let first = run(ManualClock::new(0, 1));
        let second = run(ManualClock::new(1_000_000, 7));
        let keys1: Vec<_> = first.transitions.iter().map(|r| r.key()).collect();
        let keys2: Vec<_> = second.transitions.iter().map(|r| r.key()).collect();
        prop_assert_eq!(keys1, keys2);
        prop_assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn prop_records_match_trajectories(a in arb_object(1), b in arb_object(2)) {
        let report = RunLoop::new(&a, &b, &RunSettings::default(), ManualClock::default(), NoPacing)
            .unwrap()
            .run()
            .unwrap();
        for w in report.transitions.windows(2) {
            prop_assert!(w[0].timestamp < w[1].timestamp);
        }
        for record in &report.transitions {
            let object = if record.object_id == a.id { &a } else { &b };
            let expected = object.position_at(record.step).unwrap();
            prop_assert_eq!(record.position(), expected);
        }
    }
}
