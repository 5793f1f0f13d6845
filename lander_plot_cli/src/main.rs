use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use lander_plot::{
    load_results, plot_results, Branch, Figure, LanderError, Params, PlotOutcome, Renderer,
    ResultsTable,
};
use ndarray::Array1;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const CHART_SIZE: (u32, u32) = (1280, 760);

#[derive(Parser, Debug)]
#[command(author, version, about = "Plot lander descent velocity against altitude", long_about = None)]
struct Cli {
    /// Simulator results file (`altitude velocity` per line)
    #[arg(value_hint = ValueHint::FilePath)]
    results: PathBuf,

    /// Output PNG figure path (defaults next to the results file)
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG figure path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Disable plot generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Export altitude, velocity and ideal profile as CSV (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,

    /// JSON file overriding the descent law constants
    #[arg(long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    handle_plot(cli)
}

fn handle_plot(cli: Cli) -> Result<()> {
    let params = match cli.params.as_ref() {
        Some(path) => load_params(path)?,
        None => Params::default(),
    };
    debug!("Descent law: {:?}", params);

    let table = load_results(&cli.results)
        .with_context(|| format!("failed to load {}", cli.results.display()))?;

    let plotted = if cli.no_plot {
        plot_results(&table, &params, &mut SkipRenderer)
    } else {
        let targets = chart_targets(&cli)?;
        plot_results(&table, &params, &mut ChartRenderer { targets })
    };
    let outcome =
        plotted.with_context(|| format!("failed to plot {}", cli.results.display()))?;

    log_summary(&outcome, &params);

    if let Some(path) = cli.csv.as_ref() {
        if path.as_os_str() == "-" {
            write_profile_stdout(&table, outcome.ideal.as_ref())?;
        } else {
            write_profile_csv(&table, outcome.ideal.as_ref(), path)?;
            info!("Wrote profile CSV: {}", path.display());
        }
    }

    Ok(())
}

fn load_params(path: &Path) -> Result<Params> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read params {}", path.display()))?;
    Params::from_json_str(&text)
        .with_context(|| format!("{} is not a valid params file", path.display()))
}

fn default_png_path(results: &Path) -> PathBuf {
    let mut png = results.to_path_buf();
    png.set_extension("png");
    if png == results {
        let name = results
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".to_string());
        png = results.with_file_name(format!("{}.png", name));
    }
    png
}

fn chart_targets(cli: &Cli) -> Result<Vec<(PathBuf, ChartKind)>> {
    let mut targets = vec![(
        cli.png
            .clone()
            .unwrap_or_else(|| default_png_path(&cli.results)),
        ChartKind::Png,
    )];
    if let Some(path) = cli.svg.as_ref() {
        targets.push((path.clone(), ChartKind::Svg));
    }
    if let Some((path, _)) = targets.iter().find(|(path, _)| path == &cli.results) {
        return Err(anyhow!(
            "refusing to draw over the results file {}",
            path.display()
        ));
    }
    Ok(targets)
}

fn log_summary(outcome: &PlotOutcome, params: &Params) {
    let summary = &outcome.summary;
    info!(
        "Loaded {} rows, altitude {:.1}..{:.1} m",
        summary.rows, summary.altitude_min_m, summary.altitude_max_m
    );
    info!(
        "Final sample: {:.1} m at {:.2} m/s",
        summary.final_altitude_m, summary.final_velocity_mps
    );
    match (outcome.branch, summary.rms_error_mps, summary.max_abs_error_mps) {
        (Branch::Included, Some(rms), Some(max)) => info!(
            "Tracking error vs ideal: rms {:.3} m/s, max {:.3} m/s",
            rms, max
        ),
        _ => info!(
            "Ideal profile skipped: start altitude {:.0} m above {:.0} m",
            summary.first_altitude_m, params.exclusion_threshold_m
        ),
    }
}

fn write_profile_stdout(table: &ResultsTable, ideal: Option<&Array1<f64>>) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_profile_rows(table, ideal, &mut writer)
}

fn write_profile_csv(table: &ResultsTable, ideal: Option<&Array1<f64>>, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_profile_rows(table, ideal, &mut writer)
}

fn write_profile_rows<W: Write>(
    table: &ResultsTable,
    ideal: Option<&Array1<f64>>,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record([
        "altitude_m",
        "velocity_mps",
        "ideal_velocity_mps",
        "tracking_error_mps",
    ])?;

    for (idx, (altitude, velocity)) in table.rows().enumerate() {
        let ideal_v = ideal.and_then(|values| values.get(idx).copied());
        writer.write_record([
            format!("{:.3}", altitude),
            format!("{:.3}", velocity),
            ideal_v
                .map(|v| format!("{:.3}", v))
                .unwrap_or_else(|| "".into()),
            ideal_v
                .map(|v| format!("{:.3}", v - velocity))
                .unwrap_or_else(|| "".into()),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[derive(Clone, Copy, Debug)]
enum ChartKind {
    Png,
    Svg,
}

/// Draws every figure to each target file in turn.
struct ChartRenderer {
    targets: Vec<(PathBuf, ChartKind)>,
}

impl Renderer for ChartRenderer {
    fn render(&mut self, figure: &Figure) -> Result<(), LanderError> {
        for (path, kind) in &self.targets {
            render_chart_guard(figure, path, *kind)?;
            info!("Wrote plot: {}", path.display());
        }
        Ok(())
    }
}

struct SkipRenderer;

impl Renderer for SkipRenderer {
    fn render(&mut self, figure: &Figure) -> Result<(), LanderError> {
        debug!("Plot disabled; {} series not drawn", figure.series.len());
        Ok(())
    }
}

fn render_chart_guard(figure: &Figure, path: &Path, kind: ChartKind) -> Result<(), LanderError> {
    let render = || -> Result<(), LanderError> {
        render_chart(figure, path, kind)
            .map_err(|e| LanderError::Render(format!("plotting error: {}", e)))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| LanderError::Render("plotting backend panicked".to_string()))?
}

fn render_chart(figure: &Figure, path: &Path, kind: ChartKind) -> Result<()> {
    let axes = chart_axes(figure)?;
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(root, figure, axes)?;
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(root, figure, axes)?;
        }
    }
    Ok(())
}

type Axes = ((f64, f64), (f64, f64));

/// Padded axis ranges; spans that overflow `f64` cannot be laid out.
fn chart_axes(figure: &Figure) -> Result<Axes> {
    let ((x_lo, x_hi), (y_lo, y_hi)) = figure
        .bounds()
        .map(|(x, y)| (padded(x), padded(y)))
        .unwrap_or(((0.0, 1.0), (0.0, 1.0)));
    for (name, lo, hi) in [("x", x_lo, x_hi), ("y", y_lo, y_hi)] {
        if !(hi - lo).is_finite() {
            return Err(anyhow!("{} axis range {:e}..{:e} is too wide to draw", name, lo, hi));
        }
    }
    Ok(((x_lo, x_hi), (y_lo, y_hi)))
}

fn draw_chart<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    figure: &Figure,
    ((x_lo, x_hi), (y_lo, y_hi)): Axes,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    let axis_font = FontDesc::new(FontFamily::SansSerif, 20.0, FontStyle::Normal);
    let (light, bold) = if figure.grid {
        (BLACK.mix(0.06), BLACK.mix(0.2))
    } else {
        (TRANSPARENT, TRANSPARENT)
    };

    chart
        .configure_mesh()
        .light_line_style(&light)
        .bold_line_style(&bold)
        .x_desc(figure.x_label.as_str())
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .axis_desc_style(axis_font.clone().color(&BLACK))
        .label_style(axis_font.color(&BLACK.mix(0.85)))
        .draw()?;

    for (idx, series) in figure.series.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        let style = ShapeStyle {
            color: color.to_rgba(),
            filled: false,
            stroke_width: 2,
        };
        let drawn = chart.draw_series(LineSeries::new(
            series
                .points()
                .filter(|(x, y)| x.is_finite() && y.is_finite()),
            style,
        ))?;
        if figure.legend {
            drawn
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], color));
        }
    }

    if figure.legend {
        let legend_font = FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal);
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.7))
            .border_style(&BLACK.mix(0.3))
            .label_font(legend_font.color(&BLACK))
            .position(SeriesLabelPosition::UpperLeft)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

const SERIES_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(255, 127, 14)];

/// Widen a data range by 5% so curves do not touch the frame; degenerate ranges get a unit pad.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    let pad = if (hi - lo).abs() < f64::EPSILON {
        lo.abs().max(1.0) * 0.05
    } else {
        hi * 0.05 - lo * 0.05
    };
    (lo - pad, hi + pad)
}
