//! Backend-independent description of the descent figure.

use ndarray::Array1;

use super::{LanderError, ResultsTable};

pub const X_LABEL: &str = "altitude (m)";
pub const MEASURED_LABEL: &str = "velocity (m/s)";
pub const IDEAL_LABEL: &str = "ideal vel (m/s)";

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Figure {
    pub x_label: String,
    pub grid: bool,
    pub legend: bool,
    pub series: Vec<Series>,
}

impl Figure {
    /// Finite `(x, y)` extents over all series, `None` if nothing finite is plotted.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut x_range: Option<(f64, f64)> = None;
        let mut y_range: Option<(f64, f64)> = None;
        for (x, y) in self.series.iter().flat_map(|s| s.points()) {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            x_range = Some(x_range.map_or((x, x), |(lo, hi)| (lo.min(x), hi.max(x))));
            y_range = Some(y_range.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))));
        }
        Some((x_range?, y_range?))
    }
}

/// Draws a figure somewhere. Implementations decide the medium.
pub trait Renderer {
    fn render(&mut self, figure: &Figure) -> Result<(), LanderError>;
}

/// Measured velocity against altitude, plus the ideal profile when one is supplied.
pub fn build_figure(table: &ResultsTable, ideal: Option<&Array1<f64>>) -> Figure {
    let altitude = table.altitude().to_vec();
    let mut series = vec![Series {
        label: MEASURED_LABEL.to_string(),
        x: altitude.clone(),
        y: table.velocity().to_vec(),
    }];
    if let Some(ideal) = ideal {
        series.push(Series {
            label: IDEAL_LABEL.to_string(),
            x: altitude,
            y: ideal.to_vec(),
        });
    }
    Figure {
        x_label: X_LABEL.to_string(),
        grid: true,
        legend: true,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn measured_only_without_ideal() {
        let table = ResultsTable::from_rows(&[(200_000.0, -50.0)]);
        let figure = build_figure(&table, None);
        assert_eq!(figure.x_label, X_LABEL);
        assert!(figure.grid && figure.legend);
        assert_eq!(figure.series.len(), 1);
        assert_eq!(figure.series[0].label, MEASURED_LABEL);
        assert_eq!(figure.series[0].x, vec![200_000.0]);
        assert_eq!(figure.series[0].y, vec![-50.0]);
    }

    #[test]
    fn ideal_series_shares_altitude_axis() {
        let table = ResultsTable::from_rows(&[(100.0, -3.5), (200.0, -3.0)]);
        let ideal = array![-3.5, -6.5];
        let figure = build_figure(&table, Some(&ideal));
        assert_eq!(figure.series.len(), 2);
        assert_eq!(figure.series[1].label, IDEAL_LABEL);
        assert_eq!(figure.series[1].x, figure.series[0].x);
        assert_eq!(figure.series[1].y, vec![-3.5, -6.5]);
    }

    #[test]
    fn bounds_skip_non_finite_points() {
        let table = ResultsTable::from_rows(&[(100.0, -3.5), (f64::NAN, -1.0), (50.0, f64::INFINITY)]);
        let figure = build_figure(&table, None);
        assert_eq!(figure.bounds(), Some(((100.0, 100.0), (-3.5, -3.5))));
    }

    #[test]
    fn bounds_of_empty_figure() {
        let figure = build_figure(&ResultsTable::from_rows(&[]), None);
        assert_eq!(figure.bounds(), None);
    }
}
