pub mod analysis;
pub mod anpp;
pub mod community;
pub mod config;
pub mod generator;
pub mod grid;
pub mod logging;
pub mod raster;
pub mod report;
pub mod rng;
pub mod snapshot;

pub use analysis::Analyzer;
pub use config::{ConfigLoader, ToolkitConfig};
pub use generator::LandscapeGenerator;
