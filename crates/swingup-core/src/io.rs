//! Trajectory CSV exchange.
//!
//! On-disk format: header `time,pos1,pos2,vel1,vel2,tau1,tau2`, one row per
//! state sample at uniform dt. Positions are radians, velocities rad/s,
//! torques N·m. The table has `N + 1` rows for `N` control intervals; the
//! final row's torque columns are written as zeros and dropped on load, so a
//! save/load round-trip recovers the in-memory trajectory exactly.

use std::path::Path;

use crate::error::TrajectoryError;
use crate::types::{ControlVector, StateVector, Trajectory};

const HEADER: [&str; 7] = ["time", "pos1", "pos2", "vel1", "vel2", "tau1", "tau2"];

/// Write a trajectory to a CSV file.
///
/// # Errors
///
/// Returns [`TrajectoryError`] on file-system or serialization failure.
pub fn save_csv(trajectory: &Trajectory, path: impl AsRef<Path>) -> Result<(), TrajectoryError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;
    let zero = ControlVector::zeros();
    for (i, x) in trajectory.states().iter().enumerate() {
        let u = trajectory.controls().get(i).unwrap_or(&zero);
        writer.write_record([
            trajectory.time(i).to_string(),
            x[0].to_string(),
            x[1].to_string(),
            x[2].to_string(),
            x[3].to_string(),
            u[0].to_string(),
            u[1].to_string(),
        ])?;
    }
    writer.flush().map_err(TrajectoryError::from)?;
    Ok(())
}

/// Read a trajectory from a CSV file written by [`save_csv`] (or by any tool
/// producing the same column order).
///
/// The timestep is recovered from the first two time samples.
///
/// # Errors
///
/// Returns [`TrajectoryError::Empty`] for files with fewer than two data rows
/// and [`TrajectoryError::MalformedRow`] for rows that do not parse as seven
/// numeric columns.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Trajectory, TrajectoryError> {
    let mut reader = csv::Reader::from_path(path)?;

    let mut times = Vec::new();
    let mut states = Vec::new();
    let mut torques = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let parsed = parse_row(&record).ok_or(TrajectoryError::MalformedRow {
            row: row + 1,
            expected: HEADER.len(),
        })?;
        times.push(parsed[0]);
        states.push(StateVector::new(parsed[1], parsed[2], parsed[3], parsed[4]));
        torques.push(ControlVector::new(parsed[5], parsed[6]));
    }

    if states.len() < 2 {
        return Err(TrajectoryError::Empty);
    }

    let dt = times[1] - times[0];
    // Controls: one fewer than states; the trailing padded row is dropped.
    torques.pop();
    Trajectory::new(dt, states, torques)
}

fn parse_row(record: &csv::StringRecord) -> Option<[f64; 7]> {
    if record.len() != HEADER.len() {
        return None;
    }
    let mut values = [0.0; 7];
    for (i, field) in record.iter().enumerate() {
        values[i] = field.trim().parse::<f64>().ok()?;
    }
    Some(values)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
