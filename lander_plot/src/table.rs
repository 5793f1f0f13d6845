use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView1};

use super::LanderError;

const ALTITUDE_COL: usize = 0;
const VELOCITY_COL: usize = 1;

/// Simulator output: one `(altitude, velocity)` row per sample, in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultsTable {
    data: Array2<f64>,
}

impl ResultsTable {
    pub fn from_rows(rows: &[(f64, f64)]) -> Self {
        let mut data = Array2::zeros((rows.len(), 2));
        for (i, &(alt, vel)) in rows.iter().enumerate() {
            data[[i, ALTITUDE_COL]] = alt;
            data[[i, VELOCITY_COL]] = vel;
        }
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn altitude(&self) -> ArrayView1<'_, f64> {
        self.data.column(ALTITUDE_COL)
    }

    pub fn velocity(&self) -> ArrayView1<'_, f64> {
        self.data.column(VELOCITY_COL)
    }

    pub fn first_altitude(&self) -> Result<f64, LanderError> {
        self.altitude()
            .first()
            .copied()
            .ok_or(LanderError::EmptyTable)
    }

    pub fn rows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.altitude()
            .into_iter()
            .copied()
            .zip(self.velocity().into_iter().copied())
    }
}

/// Read and parse a whitespace-delimited results file.
pub fn load_results(path: &Path) -> Result<ResultsTable, LanderError> {
    let text = fs::read_to_string(path).map_err(|source| LanderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_results(&text)
}

/// Parse results text. Anything after `#` is a comment and blank lines are skipped.
/// Extra columns are ignored but every data row must carry the same number of columns.
pub fn parse_results(text: &str) -> Result<ResultsTable, LanderError> {
    let mut rows = Vec::new();
    let mut width: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.split('#').next().unwrap_or_default().trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut values = Vec::with_capacity(2);
        for token in trimmed.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| LanderError::Parse {
                line,
                token: token.to_string(),
            })?;
            values.push(value);
        }

        if values.len() < 2 {
            return Err(LanderError::MissingColumns {
                line,
                found: values.len(),
            });
        }
        match width {
            Some(expected) if expected != values.len() => {
                return Err(LanderError::RaggedRow {
                    line,
                    expected,
                    found: values.len(),
                });
            }
            Some(_) => {}
            None => width = Some(values.len()),
        }

        rows.push((values[ALTITUDE_COL], values[VELOCITY_COL]));
    }

    Ok(ResultsTable::from_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulator_output() {
        let table = parse_results("100 -3.5\n200 -3.0\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.altitude().to_vec(), vec![100.0, 200.0]);
        assert_eq!(table.velocity().to_vec(), vec![-3.5, -3.0]);
        assert_eq!(table.first_altitude().unwrap(), 100.0);
    }

    #[test]
    fn tolerates_mixed_whitespace_and_comments() {
        let text = "# h v\n\n  9999.5\t-12.25  \n  \n1.0e3   -4e0\r\n";
        let table = parse_results(text).unwrap();
        assert_eq!(
            table.rows().collect::<Vec<_>>(),
            vec![(9999.5, -12.25), (1000.0, -4.0)]
        );
    }

    #[test]
    fn trailing_comments_are_stripped() {
        let table = parse_results("100 -3.5 # touchdown\n# full line\n200 -3.0#\n").unwrap();
        assert_eq!(table.rows().collect::<Vec<_>>(), vec![(100.0, -3.5), (200.0, -3.0)]);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let table = parse_results("10 -1 7\n5 -0.5 8\n").unwrap();
        assert_eq!(table.rows().collect::<Vec<_>>(), vec![(10.0, -1.0), (5.0, -0.5)]);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = parse_results("").unwrap();
        assert!(table.is_empty());
        assert!(matches!(table.first_altitude(), Err(LanderError::EmptyTable)));
    }

    #[test]
    fn rejects_non_numeric_token() {
        let err = parse_results("100 -3.5\n200 fast\n").unwrap_err();
        match err {
            LanderError::Parse { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "fast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_single_column() {
        let err = parse_results("100\n").unwrap_err();
        assert!(matches!(err, LanderError::MissingColumns { line: 1, found: 1 }));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_results("1 2 3\n4 5\n").unwrap_err();
        assert!(matches!(
            err,
            LanderError::RaggedRow {
                line: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("lander_plot_table_{}.txt", std::process::id()));
        fs::write(&path, "10000 -120\n9000 -110\n").unwrap();
        let table = load_results(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(table.len(), 2);
        assert_eq!(table.first_altitude().unwrap(), 10000.0);
    }
}
