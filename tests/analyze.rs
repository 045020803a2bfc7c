use std::fs;
use std::path::Path;

use landis_toolkit::{
    config::{AnalysisConfig, TimestepRange},
    grid::{write_ascii_grid_file, Grid, GridHeader, Shape},
    snapshot::SnapshotWarning,
    Analyzer,
};

const SHAPE: Shape = Shape {
    nrows: 2,
    ncols: 10_000,
};

fn config_for(dir: &Path, end: u32) -> AnalysisConfig {
    AnalysisConfig {
        input_dir: dir.to_path_buf(),
        timesteps: TimestepRange {
            start: 0,
            end,
            step: 5,
        },
        ..AnalysisConfig::default()
    }
}

fn biomass(area0: f64, area1: f64) -> Grid<f64> {
    Grid::from_fn(SHAPE, |row, col| {
        let base = (col % 7) as f64;
        if row == 0 {
            base + area0
        } else {
            base + area1
        }
    })
}

fn write_text_snapshot(dir: &Path, timestep: u32, grid: &Grid<f64>) {
    let path = dir.join(format!("biomass-TotalBiomass-{timestep}.img"));
    write_ascii_grid_file(path, &GridHeader::new(SHAPE), grid).unwrap();
}

fn write_raw_snapshot(dir: &Path, timestep: u32, grid: &Grid<f64>) {
    let bytes: Vec<u8> = grid
        .cells()
        .iter()
        .flat_map(|v| (*v as f32).to_le_bytes())
        .collect();
    fs::write(dir.join(format!("biomass-TotalBiomass-{timestep}.img")), bytes).unwrap();
}

#[test]
fn gap_in_snapshots_limits_intervals() {
    let dir = tempfile::tempdir().unwrap();
    write_text_snapshot(dir.path(), 0, &biomass(100.0, 100.0));
    write_text_snapshot(dir.path(), 5, &biomass(110.0, 125.0));
    write_raw_snapshot(dir.path(), 10, &biomass(120.0, 150.0));

    let report = Analyzer::new(config_for(dir.path(), 20)).run().unwrap();

    assert_eq!(report.snapshots_read, 3);
    assert_eq!(report.skipped_timesteps, vec![15, 20]);
    let steps: Vec<u32> = report.records.iter().map(|r| r.timestep).collect();
    assert_eq!(steps, vec![5, 10]);
    for record in &report.records {
        assert!((record.anpp_area0 - 2.0).abs() < 1e-9);
        assert!((record.anpp_area1 - 5.0).abs() < 1e-9);
    }

    let csv = fs::read_to_string(&report.csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "timestep,anpp_area0,anpp_area1");
    assert_eq!(lines.len(), 1 + report.intervals());
    assert!(lines.iter().all(|line| !line.starts_with("15,")));

    let chart = report.chart_path.expect("chart rendered");
    assert_eq!(chart, dir.path().join("ANPP_comparison.svg"));
    assert!(chart.exists());
}

#[test]
fn corrupt_snapshot_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_text_snapshot(dir.path(), 0, &biomass(0.0, 0.0));
    fs::write(dir.path().join("biomass-TotalBiomass-5.img"), b"\x00\x01\x02").unwrap();
    write_text_snapshot(dir.path(), 10, &biomass(50.0, 50.0));

    let loader = landis_toolkit::snapshot::SnapshotLoader::from_config(&config_for(dir.path(), 10));
    let set = loader.load();
    assert_eq!(set.len(), 2);
    assert!(matches!(
        set.warnings(),
        [SnapshotWarning::Unreadable { timestep: 5, .. }]
    ));

    let report = Analyzer::new(config_for(dir.path(), 10)).run().unwrap();
    assert!(report.records.is_empty());
}

#[test]
fn no_snapshots_gives_degenerate_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("biomass");

    let report = Analyzer::new(config_for(&input, 100)).run().unwrap();

    assert_eq!(report.snapshots_read, 0);
    assert_eq!(report.skipped_timesteps.len(), 21);
    assert!(report.records.is_empty());
    assert_eq!(report.summary.area0.count, 0);
    assert!(report.chart_path.is_none());
    assert_eq!(
        fs::read_to_string(&report.csv_path).unwrap(),
        "timestep,anpp_area0,anpp_area1\n"
    );
}
