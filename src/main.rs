use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use landis_toolkit::{logging, Analyzer, ConfigLoader, LandscapeGenerator, ToolkitConfig};

#[derive(Debug, Parser)]
#[command(author, version, about = "Landscape input generation and biomass output analysis")]
struct Cli {
    /// Path to the toolkit YAML file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the initial community, ecoregion and management area rasters
    /// plus the initial communities listing
    Generate {
        /// Override the output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Compute ANPP from total biomass snapshots and write the chart and CSV
    Analyze {
        /// Override the directory holding the biomass snapshots
        #[arg(long)]
        input_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::new(".").load(path)?,
        None => ToolkitConfig::default(),
    };
    logging::init(&config.logging.level);

    match cli.command {
        Command::Generate { output_dir, seed } => {
            if let Some(dir) = output_dir {
                config.generator.output_dir = dir;
            }
            if let Some(seed) = seed {
                config.generator.seed = seed;
            }
            let landscape = LandscapeGenerator::new(config.generator).generate()?;
            info!(
                "All files saved in: {} ({} map codes)",
                landscape.output_dir.display(),
                landscape.communities
            );
        }
        Command::Analyze { input_dir } => {
            if let Some(dir) = input_dir {
                config.analysis.input_dir = dir;
            }
            let report = Analyzer::new(config.analysis).run()?;
            info!(
                "Files analyzed: {}, time intervals calculated: {}, results saved to {}",
                report.snapshots_read,
                report.intervals(),
                report.csv_path.display()
            );
        }
    }
    Ok(())
}
