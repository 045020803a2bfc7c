//! Biomass snapshots in, ANPP table, chart and CSV out.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::anpp::compute_anpp;
use crate::config::AnalysisConfig;
use crate::report::{render_chart, write_csv, AnalysisReport, AnppSummary};
use crate::snapshot::SnapshotLoader;

pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<AnalysisReport> {
        let loader = SnapshotLoader::from_config(&self.config);
        info!(timesteps = ?loader.timesteps(), "timesteps to analyze");
        let snapshots = loader.load();

        let records = compute_anpp(&snapshots, loader.timesteps());
        let summary = AnppSummary::from_records(&records);
        info!("ANPP summary statistics:\n{summary}");
        if !records.is_empty() {
            info!(
                "Average ANPP over entire simulation period: area0={:.2}, area1={:.2}, difference={:.2}",
                summary.area0.mean,
                summary.area1.mean,
                summary.difference()
            );
        }

        let output_dir = &self.config.input_dir;
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create report directory {}", output_dir.display())
        })?;

        let chart_path = output_dir.join(&self.config.chart_name);
        let chart_path = if records.is_empty() {
            warn!("no complete snapshot interval found, chart skipped");
            None
        } else {
            render_chart(&records, &chart_path)
                .with_context(|| format!("Failed to render {}", chart_path.display()))?;
            info!(path = %chart_path.display(), "plot saved");
            Some(chart_path)
        };

        let csv_path = output_dir.join(&self.config.csv_name);
        write_csv(&records, &csv_path)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        info!(path = %csv_path.display(), "results exported");

        let report = AnalysisReport {
            snapshots_read: snapshots.len(),
            skipped_timesteps: snapshots.warnings().iter().map(|w| w.timestep()).collect(),
            records,
            summary,
            csv_path,
            chart_path,
        };
        info!(
            files_analyzed = report.snapshots_read,
            intervals = report.intervals(),
            skipped = report.skipped_timesteps.len(),
            "analysis complete"
        );
        Ok(report)
    }
}
