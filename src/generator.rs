//! Synthetic landscape inputs: three grids and the initial communities listing.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::community::{generate_communities, write_listing};
use crate::config::GeneratorConfig;
use crate::grid::{self, write_ascii_grid_file, Grid};
use crate::rng::{RngManager, COMMUNITIES_STREAM};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct GeneratedLandscape {
    pub output_dir: PathBuf,
    pub files: Vec<GeneratedFile>,
    pub communities: usize,
}

pub struct LandscapeGenerator {
    config: GeneratorConfig,
    rng: RngManager,
}

impl LandscapeGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = RngManager::new(config.seed);
        Self { config, rng }
    }

    pub fn generate(&self) -> Result<GeneratedLandscape> {
        self.config
            .validate()
            .context("Invalid generator configuration")?;
        let output_dir = self.config.output_dir.clone();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        info!(dir = %output_dir.display(), seed = self.rng.master_seed(), "generating landscape");

        let shape = self.config.shape();
        let files = &self.config.files;

        let map_codes = output_dir.join(&files.initial_community);
        self.write_grid(&map_codes, "initial community", &grid::map_code_grid(shape))?;

        let ecoregion = output_dir.join(&files.ecoregion);
        self.write_grid(
            &ecoregion,
            "ecoregion",
            &grid::constant_grid(shape, self.config.ecoregion_code),
        )?;

        let management = output_dir.join(&files.management_area);
        self.write_grid(&management, "management area", &grid::row_index_grid(shape))?;

        let listing = output_dir.join(&files.communities);
        let communities = self.write_communities(&listing)?;

        let files = verify_outputs(&[map_codes, ecoregion, management, listing])?;
        info!(dir = %output_dir.display(), "all landscape files generated");
        Ok(GeneratedLandscape {
            output_dir,
            files,
            communities,
        })
    }

    fn write_grid(&self, path: &Path, label: &str, grid: &Grid<i64>) -> Result<()> {
        write_ascii_grid_file(path, &self.config.grid_header(), grid)
            .with_context(|| format!("Failed to write {label} raster {}", path.display()))?;
        info!(path = %path.display(), shape = %grid.shape(), "{label} raster saved");
        Ok(())
    }

    fn write_communities(&self, path: &Path) -> Result<usize> {
        let mut rng = self.rng.stream(COMMUNITIES_STREAM);
        let records = generate_communities(
            &mut rng,
            1..=self.config.map_code_count(),
            &self.config.composition,
        );

        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_listing(&mut writer, &records)
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), map_codes = records.len(), "initial communities saved");
        Ok(records.len())
    }
}

fn verify_outputs(paths: &[PathBuf]) -> Result<Vec<GeneratedFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = fs::metadata(path)
                .with_context(|| format!("Expected output {} is missing", path.display()))?
                .len();
            info!(path = %path.display(), bytes, "verified");
            Ok(GeneratedFile {
                path: path.clone(),
                bytes,
            })
        })
        .collect()
}
