//! Descriptive statistics, CSV export and the ANPP comparison chart.

use std::fmt;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use thiserror::Error;

use crate::anpp::AnppRecord;

pub const CSV_HEADER: [&str; 3] = ["timestep", "anpp_area0", "anpp_area1"];

const AREA0_LABEL: &str = "Not affected by Commercial Thinning";
const AREA1_LABEL: &str = "Affected by Commercial Thinning";
const AREA0_COLOR: RGBColor = RGBColor(0xa3, 0xbe, 0x8c);
const AREA1_COLOR: RGBColor = RGBColor(0xeb, 0xcb, 0x8b);
const CHART_SIZE: (u32, u32) = (1200, 800);
const X_PADDING: f64 = 2.0;
const ZERO_LINE_DASH: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("no ANPP records to plot")]
    EmptySeries,
    #[error("chart rendering failed: {0}")]
    Chart(String),
}

/// Count, mean, sample standard deviation, extremes and quartiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl SeriesSummary {
    pub fn describe(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                q25: f64::NAN,
                median: f64::NAN,
                q75: f64::NAN,
                max: f64::NAN,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = if sorted.len() > 1 {
            let squares: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (n - 1.0)).sqrt()
        } else {
            f64::NAN
        };

        Self {
            count: sorted.len(),
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnppSummary {
    pub area0: SeriesSummary,
    pub area1: SeriesSummary,
}

impl AnppSummary {
    pub fn from_records(records: &[AnppRecord]) -> Self {
        let area0: Vec<f64> = records.iter().map(|r| r.anpp_area0).collect();
        let area1: Vec<f64> = records.iter().map(|r| r.anpp_area1).collect();
        Self {
            area0: SeriesSummary::describe(&area0),
            area1: SeriesSummary::describe(&area1),
        }
    }

    /// Mean ANPP of the treated region minus the untreated one.
    pub fn difference(&self) -> f64 {
        self.area1.mean - self.area0.mean
    }
}

impl fmt::Display for AnppSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<6}{:>14}{:>14}", "", "anpp_area0", "anpp_area1")?;
        writeln!(f, "{:<6}{:>14}{:>14}", "count", self.area0.count, self.area1.count)?;
        let rows = [
            ("mean", self.area0.mean, self.area1.mean),
            ("std", self.area0.std, self.area1.std),
            ("min", self.area0.min, self.area1.min),
            ("25%", self.area0.q25, self.area1.q25),
            ("50%", self.area0.median, self.area1.median),
            ("75%", self.area0.q75, self.area1.q75),
            ("max", self.area0.max, self.area1.max),
        ];
        for (label, a0, a1) in rows {
            writeln!(f, "{label:<6}{a0:>14.4}{a1:>14.4}")?;
        }
        Ok(())
    }
}

/// Header row is always written, so an empty run still yields a valid file.
pub fn write_csv(records: &[AnppRecord], path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn render_chart(records: &[AnppRecord], path: &Path) -> Result<(), ReportError> {
    if records.is_empty() {
        return Err(ReportError::EmptySeries);
    }
    draw_chart(records, path).map_err(|err| ReportError::Chart(err.to_string()))
}

fn draw_chart(records: &[AnppRecord], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (x_min, x_max) = records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        let t = r.timestep as f64;
        (lo.min(t), hi.max(t))
    });
    let (x_min, x_max) = (x_min - X_PADDING, x_max + X_PADDING);
    let (y_min, y_max) = value_bounds(records);

    let area0: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (r.timestep as f64, r.anpp_area0))
        .collect();
    let area1: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (r.timestep as f64, r.anpp_area1))
        .collect();

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ANPP Comparison Between Management Areas", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d((x_min..x_max).with_key_points(x_ticks(records)), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x| format!("{x:.0}"))
        .x_desc("Simulation Year")
        .y_desc("Average Annual Net Primary Productivity (ANPP) (g/m2)")
        .draw()?;

    // y = 0 reference
    chart.draw_series(
        dashed_segments(x_min, x_max, ZERO_LINE_DASH)
            .into_iter()
            .map(|(a, b)| PathElement::new(vec![(a, 0.0), (b, 0.0)], BLACK.mix(0.5))),
    )?;

    chart
        .draw_series(LineSeries::new(area0.iter().copied(), AREA0_COLOR.stroke_width(2)))?
        .label(AREA0_LABEL)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], AREA0_COLOR.stroke_width(2)));
    chart.draw_series(
        area0
            .iter()
            .map(|&point| Circle::new(point, 5, AREA0_COLOR.filled())),
    )?;

    chart
        .draw_series(LineSeries::new(area1.iter().copied(), AREA1_COLOR.stroke_width(2)))?
        .label(AREA1_LABEL)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], AREA1_COLOR.stroke_width(2)));
    chart.draw_series(
        area1
            .iter()
            .map(|&point| TriangleMarker::new(point, 6, AREA1_COLOR.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Every other interval end, so the default 5-year series is labelled 5, 15, ..., 95.
fn x_ticks(records: &[AnppRecord]) -> Vec<f64> {
    records.iter().step_by(2).map(|r| r.timestep as f64).collect()
}

/// Dash intervals of length `dash` separated by equal gaps along `from..to`.
fn dashed_segments(from: f64, to: f64, dash: f64) -> Vec<(f64, f64)> {
    if dash.is_nan() || dash <= 0.0 || to <= from {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut start = from;
    while start < to {
        segments.push((start, (start + dash).min(to)));
        start += 2.0 * dash;
    }
    segments
}

fn value_bounds(records: &[AnppRecord]) -> (f64, f64) {
    let (lo, hi) = records
        .iter()
        .flat_map(|r| [r.anpp_area0, r.anpp_area1])
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.1 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Outcome of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub snapshots_read: usize,
    pub skipped_timesteps: Vec<u32>,
    pub records: Vec<AnppRecord>,
    pub summary: AnppSummary,
    pub csv_path: PathBuf,
    pub chart_path: Option<PathBuf>,
}

impl AnalysisReport {
    pub fn intervals(&self) -> usize {
        self.records.len()
    }
}
