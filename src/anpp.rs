//! Net primary productivity from consecutive biomass snapshots
//!
//! For each consecutive pair of requested timesteps the per-cell biomass
//! change is averaged over each region row and divided by the years between
//! the two snapshots. Pairs with a missing endpoint produce no record.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::grid::Grid;
use crate::snapshot::SnapshotSet;

pub const AREA0_ROW: usize = 0;
pub const AREA1_ROW: usize = 1;

/// ANPP of both regions over the interval ending at `timestep`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnppRecord {
    pub timestep: u32,
    pub anpp_area0: f64,
    pub anpp_area1: f64,
}

pub fn compute_anpp(snapshots: &SnapshotSet, timesteps: &[u32]) -> Vec<AnppRecord> {
    let mut records = Vec::new();
    for pair in timesteps.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        let (before, after) = match (snapshots.get(previous), snapshots.get(current)) {
            (Some(before), Some(after)) => (before, after),
            _ => {
                debug!(previous, current, "interval skipped, snapshot missing");
                continue;
            }
        };

        let years = match current.checked_sub(previous) {
            Some(years) if years > 0 => years as f64,
            _ => {
                warn!(previous, current, "timesteps are not increasing, interval skipped");
                continue;
            }
        };

        let (Some(delta0), Some(delta1)) = (
            mean_row_change(before, after, AREA0_ROW),
            mean_row_change(before, after, AREA1_ROW),
        ) else {
            warn!(
                previous,
                current,
                before = %before.shape(),
                after = %after.shape(),
                "snapshot shapes differ, interval skipped"
            );
            continue;
        };

        let record = AnppRecord {
            timestep: current,
            anpp_area0: delta0 / years,
            anpp_area1: delta1 / years,
        };
        info!(
            "Timestep {}: ANPP Area0={:.2}, Area1={:.2}",
            record.timestep, record.anpp_area0, record.anpp_area1
        );
        records.push(record);
    }
    info!(intervals = records.len(), "ANPP calculated");
    records
}

fn mean_row_change(before: &Grid<f64>, after: &Grid<f64>, row: usize) -> Option<f64> {
    if before.shape() != after.shape() {
        return None;
    }
    let (before, after) = (before.row(row)?, after.row(row)?);
    let total: f64 = after.iter().zip(before).map(|(a, b)| a - b).sum();
    Some(total / after.len() as f64)
}
