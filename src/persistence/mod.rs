//! JSON-lines export of trajectory tables and transition logs
//!
//! Features:
//! - Trajectory master table: one row per (object, step)
//! - Transition log: one row per recorded advance, object attributes joined in
//! - Reader for transition logs written by this module

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ObjectId;
use crate::clock::Timestamp;
use crate::error::{ArbiterError, Result};
use crate::sim::{Object, TransitionRecord};

/// One sample of an object's trajectory with the object's attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub object_id: ObjectId,
    pub name: String,
    pub x_center: Option<f64>,
    pub y_center: Option<f64>,
    pub radius: Option<f64>,
    pub splits: usize,
    pub cycles: Option<f64>,
    pub priority: u32,
    pub group: u32,
    pub safety_radius: f64,
    pub theta: Option<f64>,
    pub step: usize,
    pub x: f64,
    pub y: f64,
}

/// A transition record joined with its object's attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub object_id: ObjectId,
    pub name: String,
    pub priority: u32,
    pub group: u32,
    pub safety_radius: f64,
    pub step: usize,
    pub x: f64,
    pub y: f64,
    pub timestamp: Timestamp,
    pub tick: u64,
}

impl TransitionRow {
    pub fn new(object: &Object, record: &TransitionRecord) -> Self {
        Self {
            object_id: object.id,
            name: object.name.clone(),
            priority: object.priority,
            group: object.group,
            safety_radius: object.safety_radius,
            step: record.step,
            x: record.x,
            y: record.y,
            timestamp: record.timestamp,
            tick: record.tick,
        }
    }
}

/// Flatten an object's trajectory into master table rows
pub fn trajectory_rows(object: &Object) -> Vec<TrajectoryRow> {
    let params = object.trajectory.params();
    object
        .trajectory
        .points()
        .iter()
        .enumerate()
        .map(|(step, pos)| TrajectoryRow {
            object_id: object.id,
            name: object.name.clone(),
            x_center: params.map(|p| p.center.x),
            y_center: params.map(|p| p.center.y),
            radius: params.map(|p| p.radius),
            splits: object.trajectory.len(),
            cycles: params.map(|p| p.cycles),
            priority: object.priority,
            group: object.group,
            safety_radius: object.safety_radius,
            theta: object.trajectory.theta_at(step),
            step,
            x: pos.x,
            y: pos.y,
        })
        .collect()
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, row: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Write the master table for `objects`, ordered by object then step.
/// Returns the number of rows written.
pub fn write_trajectory_table<W: Write>(writer: &mut W, objects: &[&Object]) -> Result<usize> {
    let mut count = 0;
    for object in objects {
        for row in trajectory_rows(object) {
            write_line(writer, &row)?;
            count += 1;
        }
    }
    writer.flush()?;
    Ok(count)
}

/// Owning object of each record, in record order
fn record_owners<'o>(objects: &[&'o Object], records: &[TransitionRecord]) -> Result<Vec<&'o Object>> {
    records
        .iter()
        .map(|record| {
            objects
                .iter()
                .copied()
                .find(|o| o.id == record.object_id)
                .ok_or_else(|| {
                    ArbiterError::invalid(format!(
                        "transition for unknown object {}",
                        record.object_id
                    ))
                })
        })
        .collect()
}

/// Write a transition log in record order. Every record must belong to one
/// of `objects`. Returns the number of rows written.
pub fn write_transition_log<W: Write>(
    writer: &mut W,
    objects: &[&Object],
    records: &[TransitionRecord],
) -> Result<usize> {
    // Resolve every record first so a bad log never leaves partial output
    let owners = record_owners(objects, records)?;
    for (object, record) in owners.into_iter().zip(records) {
        write_line(writer, &TransitionRow::new(object, record))?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Read a transition log back, skipping blank lines
pub fn read_transition_log<R: BufRead>(reader: R) -> Result<Vec<TransitionRow>> {
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}

pub fn save_trajectory_table(path: impl AsRef<Path>, objects: &[&Object]) -> Result<usize> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let count = write_trajectory_table(&mut writer, objects)?;
    log::info!("Trajectory table saved to {} ({} rows)", path.display(), count);
    Ok(count)
}

pub fn save_transition_log(
    path: impl AsRef<Path>,
    objects: &[&Object],
    records: &[TransitionRecord],
) -> Result<usize> {
    let path = path.as_ref();
    record_owners(objects, records)?;
    let mut writer = BufWriter::new(File::create(path)?);
    let count = write_transition_log(&mut writer, objects, records)?;
    log::info!("Transition log saved to {} ({} rows)", path.display(), count);
    Ok(count)
}

pub fn load_transition_log(path: impl AsRef<Path>) -> Result<Vec<TransitionRow>> {
    let reader = BufReader::new(File::open(path)?);
    read_transition_log(reader)
}
