//! Orbit Arbiter entry point
//!
//! Loads a scenario, runs the pair to completion and optionally exports the
//! trajectory table and transition log as JSON lines.
//!
//! ```text
//! orbit-arbiter [scenario.json] [--transitions out.jsonl] [--trajectories out.jsonl]
//!               [--pacing-ms N] [--max-ticks N] [--tie-break lower-id|reject]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use orbit_arbiter::persistence::{save_trajectory_table, save_transition_log};
use orbit_arbiter::sim::{RunReport, run_pair};
use orbit_arbiter::{Result, ScenarioConfig, TieBreak};

/// Arbitrate two objects on precomputed periodic trajectories
#[derive(Parser, Debug)]
#[command(name = "orbit-arbiter", version, long_about = None)]
struct Cli {
    /// Scenario file (JSON); runs the built-in demo when omitted
    scenario: Option<PathBuf>,

    /// Write the transition log as JSON lines
    #[arg(long, value_name = "PATH")]
    transitions: Option<PathBuf>,

    /// Write the trajectory master table as JSON lines
    #[arg(long, value_name = "PATH")]
    trajectories: Option<PathBuf>,

    /// Delay between ticks in milliseconds
    #[arg(long, value_name = "MS")]
    pacing_ms: Option<u64>,

    /// Stop after this many ticks
    #[arg(long, value_name = "N")]
    max_ticks: Option<u64>,

    /// Ranking policy for equal priorities
    #[arg(long, value_enum)]
    tie_break: Option<TieBreak>,
}

fn print_report(report: &RunReport) {
    let summary = &report.summary;
    println!("Termination: {:?}", report.termination);
    println!(
        "Ticks: {} (both advanced: {}, preferred advanced: {}, yielded: {})",
        summary.ticks, summary.both_advanced, summary.preferred_advanced, summary.yielded
    );
    for object in &summary.objects {
        println!(
            "  object {} ({}): step {}/{}, {} advances",
            object.object_id, object.name, object.final_step, object.last_step, object.advances
        );
    }
    println!("Transitions recorded: {}", report.transitions.len());
}

fn run(cli: Cli) -> Result<()> {
    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioConfig::load(path)?,
        None => {
            log::info!("No scenario given, running built-in demo");
            ScenarioConfig::demo()
        }
    };
    if let Some(ms) = cli.pacing_ms {
        scenario.settings.pacing_ms = ms;
    }
    if let Some(limit) = cli.max_ticks {
        scenario.settings.max_ticks = Some(limit);
    }
    if let Some(tie_break) = cli.tie_break {
        scenario.settings.tie_break = tie_break;
    }

    log::info!("Tie-break policy: {}", scenario.settings.tie_break.as_str());

    let (a, b) = scenario.build_pair()?;
    if let Some(path) = &cli.trajectories {
        save_trajectory_table(path, &[&a, &b])?;
    }

    let report = run_pair(&a, &b, &scenario.settings)?;
    print_report(&report);

    if let Some(path) = &cli.transitions {
        save_transition_log(path, &[&a, &b], &report.transitions)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Orbit Arbiter starting...");

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
