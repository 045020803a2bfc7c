//! Toolkit configuration loaded from YAML
//!
//! Every field has a default, so an empty file (or no file at all) runs the
//! standard 2 x 10000 landscape with seed 42 and timesteps 0..=100 by 5.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::community::CompositionRules;
use crate::grid::{GridHeader, Shape, DEFAULT_NODATA};

fn default_output_dir() -> PathBuf {
    PathBuf::from("landscape")
}

fn default_seed() -> u64 {
    42
}

fn default_nrows() -> usize {
    Shape::LANDSCAPE.nrows
}

fn default_ncols() -> usize {
    Shape::LANDSCAPE.ncols
}

fn default_ecoregion_code() -> i64 {
    328
}

fn default_cellsize() -> f64 {
    1.0
}

fn default_nodata() -> f64 {
    DEFAULT_NODATA
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("output/biomass")
}

fn default_file_template() -> String {
    "biomass-TotalBiomass-{timestep}.img".to_string()
}

fn default_csv_name() -> String {
    "ANPP_results.csv".to_string()
}

fn default_chart_name() -> String {
    "ANPP_comparison.svg".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolkitConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_nrows")]
    pub nrows: usize,
    #[serde(default = "default_ncols")]
    pub ncols: usize,
    #[serde(default = "default_ecoregion_code")]
    pub ecoregion_code: i64,
    #[serde(default)]
    pub xllcorner: f64,
    #[serde(default)]
    pub yllcorner: f64,
    #[serde(default = "default_cellsize")]
    pub cellsize: f64,
    #[serde(default = "default_nodata")]
    pub nodata_value: f64,
    #[serde(default)]
    pub files: GeneratorFiles,
    #[serde(default)]
    pub composition: CompositionRules,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            seed: default_seed(),
            nrows: default_nrows(),
            ncols: default_ncols(),
            ecoregion_code: default_ecoregion_code(),
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: default_cellsize(),
            nodata_value: default_nodata(),
            files: GeneratorFiles::default(),
            composition: CompositionRules::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn shape(&self) -> Shape {
        Shape::new(self.nrows, self.ncols)
    }

    pub fn grid_header(&self) -> GridHeader {
        GridHeader {
            xllcorner: self.xllcorner,
            yllcorner: self.yllcorner,
            cellsize: self.cellsize,
            nodata_value: self.nodata_value,
            ..GridHeader::new(self.shape())
        }
    }

    /// One community per column of the map-code grid.
    pub fn map_code_count(&self) -> u32 {
        self.ncols as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nrows < 2 || self.ncols == 0 {
            return Err(ConfigError(format!(
                "generator landscape needs at least 2 rows and 1 column, got {}",
                self.shape()
            )));
        }
        if self.ncols > u32::MAX as usize || self.shape().checked_cell_count().is_none() {
            return Err(ConfigError(format!(
                "generator landscape {} is larger than map codes can address",
                self.shape()
            )));
        }
        self.composition
            .validate()
            .map_err(|err| ConfigError(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorFiles {
    pub initial_community: String,
    pub ecoregion: String,
    pub management_area: String,
    pub communities: String,
}

impl Default for GeneratorFiles {
    fn default() -> Self {
        Self {
            initial_community: "initial_community.tif".to_string(),
            ecoregion: "ecoregion.tif".to_string(),
            management_area: "management_area.tif".to_string(),
            communities: "initial_communities.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestepRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for TimestepRange {
    fn default() -> Self {
        Self {
            start: 0,
            end: 100,
            step: 5,
        }
    }
}

impl TimestepRange {
    pub fn timesteps(&self) -> Vec<u32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default)]
    pub timesteps: TimestepRange,
    /// Snapshot file name; `{timestep}` is replaced by the timestep.
    #[serde(default = "default_file_template")]
    pub file_template: String,
    #[serde(default = "default_nrows")]
    pub nrows: usize,
    #[serde(default = "default_ncols")]
    pub ncols: usize,
    #[serde(default = "default_csv_name")]
    pub csv_name: String,
    #[serde(default = "default_chart_name")]
    pub chart_name: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            timesteps: TimestepRange::default(),
            file_template: default_file_template(),
            nrows: default_nrows(),
            ncols: default_ncols(),
            csv_name: default_csv_name(),
            chart_name: default_chart_name(),
        }
    }
}

impl AnalysisConfig {
    pub fn shape(&self) -> Shape {
        Shape::new(self.nrows, self.ncols)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ToolkitConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: ToolkitConfig =
            serde_yaml::from_str(text).context("Failed to parse toolkit configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generator.validate()?;

        let analysis = &self.analysis;
        if analysis.nrows < 2 || analysis.ncols == 0 {
            return Err(ConfigError(format!(
                "analysis snapshots need at least 2 rows and 1 column, got {}",
                analysis.shape()
            )));
        }
        let timesteps = analysis.timesteps;
        if timesteps.step == 0 || timesteps.end < timesteps.start {
            return Err(ConfigError(format!(
                "timesteps must satisfy step > 0 and end >= start, got {}..={} by {}",
                timesteps.start, timesteps.end, timesteps.step
            )));
        }
        if !analysis.file_template.contains("{timestep}") {
            return Err(ConfigError(format!(
                "snapshot file template `{}` has no {{timestep}} placeholder",
                analysis.file_template
            )));
        }
        Ok(())
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<ToolkitConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ToolkitConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ToolkitConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.generator.seed, 42);
        assert_eq!(config.generator.shape(), Shape::LANDSCAPE);
        assert_eq!(config.generator.ecoregion_code, 328);
        assert_eq!(config.analysis.timesteps.timesteps().len(), 21);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r#"
generator:
  seed: 7
  composition:
    cohort_ages: { min: 10, max: 80, step: 10 }
analysis:
  timesteps: { start: 0, end: 20, step: 5 }
"#;
        let config = ToolkitConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.generator.seed, 7);
        assert_eq!(config.generator.composition.cohort_ages.max, 80);
        assert_eq!(config.generator.composition.species_per_site.max, 6);
        assert_eq!(config.analysis.timesteps.timesteps(), vec![0, 5, 10, 15, 20]);
        assert_eq!(config.analysis.csv_name, "ANPP_results.csv");
    }

    #[test]
    fn default_file_names_match_scenario_inputs() {
        let files = GeneratorFiles::default();
        assert_eq!(files.initial_community, "initial_community.tif");
        assert_eq!(files.ecoregion, "ecoregion.tif");
        assert_eq!(files.management_area, "management_area.tif");
        assert_eq!(files.communities, "initial_communities.txt");
    }

    #[test]
    fn generator_validation_rejects_bad_composition() {
        let mut config = GeneratorConfig::default();
        config.composition.species_per_site.max = 25;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.composition.cohort_ages.step = 0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.nrows = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_bad_timesteps() {
        let mut config = ToolkitConfig::default();
        config.analysis.timesteps.step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_template_without_placeholder() {
        let mut config = ToolkitConfig::default();
        config.analysis.file_template = "biomass.img".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn loader_reads_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("toolkit.yaml"),
            "generator:\n  output_dir: out\n",
        )
        .unwrap();
        let config = ConfigLoader::new(dir.path()).load("toolkit.yaml").unwrap();
        assert_eq!(config.generator.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn loader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new(dir.path()).load("absent.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
