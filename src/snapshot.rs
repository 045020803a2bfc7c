//! Loading of total-biomass snapshots written by the landscape model
//!
//! One raster per timestep. A missing or unreadable file is recorded as a
//! [`SnapshotWarning`] and skipped; the loader itself never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::grid::{Grid, Shape};
use crate::raster;

pub const TIMESTEP_PLACEHOLDER: &str = "{timestep}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotWarning {
    Missing {
        timestep: u32,
        path: PathBuf,
    },
    Unreadable {
        timestep: u32,
        path: PathBuf,
        cause: String,
    },
}

impl SnapshotWarning {
    pub fn timestep(&self) -> u32 {
        match self {
            SnapshotWarning::Missing { timestep, .. }
            | SnapshotWarning::Unreadable { timestep, .. } => *timestep,
        }
    }
}

impl fmt::Display for SnapshotWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotWarning::Missing { path, .. } => {
                write!(f, "file not found: {}", path.display())
            }
            SnapshotWarning::Unreadable { path, cause, .. } => {
                write!(f, "could not open {}: {cause}", path.display())
            }
        }
    }
}

/// Biomass grids keyed by timestep, plus whatever went wrong loading them.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    snapshots: BTreeMap<u32, Grid<f64>>,
    warnings: Vec<SnapshotWarning>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timestep: u32, biomass: Grid<f64>) {
        self.snapshots.insert(timestep, biomass);
    }

    pub fn record_warning(&mut self, warning: SnapshotWarning) {
        self.warnings.push(warning);
    }

    pub fn get(&self, timestep: u32) -> Option<&Grid<f64>> {
        self.snapshots.get(&timestep)
    }

    pub fn timesteps(&self) -> impl Iterator<Item = u32> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn warnings(&self) -> &[SnapshotWarning] {
        &self.warnings
    }
}

pub struct SnapshotLoader {
    input_dir: PathBuf,
    file_template: String,
    timesteps: Vec<u32>,
    shape: Shape,
}

impl SnapshotLoader {
    pub fn new(input_dir: impl Into<PathBuf>, timesteps: Vec<u32>, shape: Shape) -> Self {
        Self {
            input_dir: input_dir.into(),
            file_template: "biomass-TotalBiomass-{timestep}.img".to_string(),
            timesteps,
            shape,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.input_dir.clone(),
            config.timesteps.timesteps(),
            config.shape(),
        )
        .with_template(config.file_template.clone())
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.file_template = template.into();
        self
    }

    pub fn timesteps(&self) -> &[u32] {
        &self.timesteps
    }

    pub fn file_name(&self, timestep: u32) -> String {
        self.file_template
            .replace(TIMESTEP_PLACEHOLDER, &timestep.to_string())
    }

    pub fn path_for(&self, timestep: u32) -> PathBuf {
        self.input_dir.join(self.file_name(timestep))
    }

    pub fn load(&self) -> SnapshotSet {
        if self.input_dir.is_dir() {
            info!(dir = %self.input_dir.display(), "reading biomass snapshots");
        } else {
            warn!(dir = %self.input_dir.display(), "input folder does not exist");
        }

        let mut set = SnapshotSet::new();
        for &timestep in &self.timesteps {
            let path = self.path_for(timestep);
            if !path.is_file() {
                let warning = SnapshotWarning::Missing { timestep, path };
                warn!(timestep, "{warning}");
                set.record_warning(warning);
                continue;
            }

            match raster::read_band(&path, self.shape) {
                Ok(biomass) => {
                    info!(timestep, shape = %biomass.shape(), "read {}", self.file_name(timestep));
                    set.insert(timestep, biomass);
                }
                Err(err) => {
                    let warning = SnapshotWarning::Unreadable {
                        timestep,
                        path,
                        cause: err.to_string(),
                    };
                    warn!(timestep, "{warning}");
                    set.record_warning(warning);
                }
            }
        }

        info!(
            loaded = set.len(),
            requested = self.timesteps.len(),
            "biomass snapshots read"
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{write_ascii_grid_file, GridHeader};
    use std::fs;

    #[test]
    fn file_name_follows_template() {
        let loader = SnapshotLoader::new("out", vec![0, 5], Shape::LANDSCAPE);
        assert_eq!(loader.file_name(35), "biomass-TotalBiomass-35.img");
        assert_eq!(
            loader.path_for(5),
            PathBuf::from("out").join("biomass-TotalBiomass-5.img")
        );
    }

    #[test]
    fn skips_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let shape = Shape::new(2, 4);
        let loader = SnapshotLoader::new(dir.path(), vec![0, 5, 10, 15], shape);

        let grid = Grid::filled(shape, 12.5);
        write_ascii_grid_file(loader.path_for(0), &GridHeader::new(shape), &grid).unwrap();
        write_ascii_grid_file(loader.path_for(10), &GridHeader::new(shape), &grid).unwrap();
        fs::write(loader.path_for(15), b"garbage").unwrap();

        let set = loader.load();
        assert_eq!(set.timesteps().collect::<Vec<_>>(), vec![0, 10]);
        assert_eq!(set.get(10), Some(&grid));

        let warnings = set.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], SnapshotWarning::Missing { timestep: 5, .. }));
        assert!(matches!(
            warnings[1],
            SnapshotWarning::Unreadable { timestep: 15, .. }
        ));
    }

    #[test]
    fn wrong_shape_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SnapshotLoader::new(dir.path(), vec![0], Shape::new(2, 4));
        let grid = Grid::filled(Shape::new(2, 3), 1.0);
        write_ascii_grid_file(loader.path_for(0), &GridHeader::new(grid.shape()), &grid).unwrap();

        let set = loader.load();
        assert!(set.is_empty());
        match &set.warnings()[0] {
            SnapshotWarning::Unreadable { cause, .. } => assert!(cause.contains("2x3")),
            other => panic!("unexpected warning {other:?}"),
        }
    }

    #[test]
    fn oversized_header_is_unreadable_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let shape = Shape::new(2, 4);
        let loader = SnapshotLoader::new(dir.path(), vec![0, 5], shape);
        let grid = Grid::filled(shape, 3.0);
        write_ascii_grid_file(loader.path_for(0), &GridHeader::new(shape), &grid).unwrap();
        let bogus = format!("ncols {}\nnrows 4\n1 2 3\n", usize::MAX / 2);
        fs::write(loader.path_for(5), bogus).unwrap();

        let set = loader.load();
        assert_eq!(set.timesteps().collect::<Vec<_>>(), vec![0]);
        assert!(matches!(
            set.warnings(),
            [SnapshotWarning::Unreadable { timestep: 5, .. }]
        ));
    }

    #[test]
    fn missing_directory_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SnapshotLoader::new(dir.path().join("absent"), vec![0, 5], Shape::LANDSCAPE);
        let set = loader.load();
        assert!(set.is_empty());
        assert_eq!(set.warnings().len(), 2);
    }
}
