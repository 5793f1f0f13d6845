//! Descent results loading and velocity-profile figures for lander simulations.
//!
//! The simulator appends one `altitude velocity` row per autopilot step to a
//! plain text results file. This crate loads that table, decides whether the
//! trajectory is compared against the ideal linear descent law, and describes
//! the resulting figure for a [`Renderer`] to draw.

use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod figure;
pub mod profile;
pub mod table;

pub use figure::{build_figure, Figure, Renderer, Series, IDEAL_LABEL, MEASURED_LABEL, X_LABEL};
pub use profile::{ideal_velocity, select_branch, summarize, tracking_error, Branch, TrackingSummary};
pub use table::{load_results, parse_results, ResultsTable};

#[derive(Error, Debug)]
pub enum LanderError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: '{token}' is not a number")]
    Parse { line: usize, token: String },
    #[error("line {line}: expected at least 2 columns, found {found}")]
    MissingColumns { line: usize, found: usize },
    #[error("line {line}: expected {expected} columns, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("results table has no rows")]
    EmptyTable,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("rendering failed: {0}")]
    Render(String),
}

/// Constants of the reference descent law and the trajectory exclusion rule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Params {
    /// First-row altitudes strictly above this skip the ideal overlay.
    pub exclusion_threshold_m: f64,
    pub intercept_mps: f64,
    pub slope_per_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            exclusion_threshold_m: 190_000.0,
            intercept_mps: 0.5,
            slope_per_s: 0.03,
        }
    }
}

impl Params {
    /// Parse a (possibly partial) JSON object; missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, LanderError> {
        let params: Params =
            serde_json::from_str(text).map_err(|e| LanderError::InvalidParameter(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), LanderError> {
        let fields = [
            ("exclusion_threshold_m", self.exclusion_threshold_m),
            ("intercept_mps", self.intercept_mps),
            ("slope_per_s", self.slope_per_s),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(LanderError::InvalidParameter(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PlotOutcome {
    pub branch: Branch,
    /// `None` when the trajectory was excluded from the ideal comparison.
    pub ideal: Option<Array1<f64>>,
    pub summary: TrackingSummary,
}

/// Pick the branch, derive the ideal profile when it applies, and render the figure once.
pub fn plot_results<R: Renderer + ?Sized>(
    table: &ResultsTable,
    params: &Params,
    renderer: &mut R,
) -> Result<PlotOutcome, LanderError> {
    params.validate()?;
    let branch = select_branch(table, params.exclusion_threshold_m)?;
    debug!("{} rows, branch {:?}", table.len(), branch);

    let ideal = match branch {
        Branch::Excluded => None,
        Branch::Included => Some(ideal_velocity(
            table.altitude(),
            params.intercept_mps,
            params.slope_per_s,
        )),
    };

    let summary = summarize(table, ideal.as_ref()).ok_or(LanderError::EmptyTable)?;

    let figure = build_figure(table, ideal.as_ref());
    renderer.render(&figure)?;

    Ok(PlotOutcome {
        branch,
        ideal,
        summary,
    })
}

/// Load a results file and plot it.
pub fn run<R: Renderer + ?Sized>(
    path: &Path,
    params: &Params,
    renderer: &mut R,
) -> Result<PlotOutcome, LanderError> {
    let table = load_results(path)?;
    plot_results(&table, params, renderer)
}
