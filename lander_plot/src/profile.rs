use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{LanderError, ResultsTable};

/// Which curves a trajectory is drawn with.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Branch {
    /// High-altitude entries; measured velocity only.
    Excluded,
    /// Measured velocity plus the ideal descent law.
    Included,
}

/// Strictly above `threshold` is excluded; a NaN first altitude compares false and is included.
pub fn select_branch(table: &ResultsTable, threshold: f64) -> Result<Branch, LanderError> {
    let first = table.first_altitude()?;
    if first > threshold {
        Ok(Branch::Excluded)
    } else {
        Ok(Branch::Included)
    }
}

/// Reference descent law `v = -(intercept + slope * h)`.
pub fn ideal_velocity(altitudes: ArrayView1<'_, f64>, intercept: f64, slope: f64) -> Array1<f64> {
    altitudes.mapv(|h| -(intercept + slope * h))
}

/// Autopilot error term: positive when the lander falls slower than the law asks.
pub fn tracking_error(measured: ArrayView1<'_, f64>, ideal: &Array1<f64>) -> Array1<f64> {
    ideal - &measured
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackingSummary {
    pub rows: usize,
    pub altitude_min_m: f64,
    pub altitude_max_m: f64,
    pub first_altitude_m: f64,
    pub first_velocity_mps: f64,
    pub final_altitude_m: f64,
    pub final_velocity_mps: f64,
    pub rms_error_mps: Option<f64>,
    pub max_abs_error_mps: Option<f64>,
}

pub fn summarize(table: &ResultsTable, ideal: Option<&Array1<f64>>) -> Option<TrackingSummary> {
    let altitude = table.altitude();
    let velocity = table.velocity();
    let first_altitude_m = *altitude.first()?;
    let first_velocity_mps = *velocity.first()?;
    let final_altitude_m = *altitude.last()?;
    let final_velocity_mps = *velocity.last()?;

    let altitude_min_m = altitude.iter().copied().fold(f64::INFINITY, f64::min);
    let altitude_max_m = altitude.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (rms_error_mps, max_abs_error_mps) = match ideal {
        Some(ideal) if ideal.len() == table.len() => {
            let error = tracking_error(velocity, ideal);
            let mean_sq = error.mapv(|e| e * e).sum() / error.len() as f64;
            let max_abs = error.iter().fold(0.0_f64, |acc, e| acc.max(e.abs()));
            (Some(mean_sq.sqrt()), Some(max_abs))
        }
        _ => (None, None),
    };

    Some(TrackingSummary {
        rows: table.len(),
        altitude_min_m,
        altitude_max_m,
        first_altitude_m,
        first_velocity_mps,
        final_altitude_m,
        final_velocity_mps,
        rms_error_mps,
        max_abs_error_mps,
    })
}
