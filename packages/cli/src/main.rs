#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for scenario setup and accessibility analysis.
//!
//! Configuration comes from `ram.toml` (or the file named by `RAM_CONFIG` /
//! `--config`) with `RAM_*` environment overrides, see [`ram_config`].

mod services;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use ram_config::Config;
use ram_database_models::{RawResultsQuery, RawResultsSort, ResultsFormat, SortDirection};

#[derive(Parser)]
#[command(name = "ram", about = "Scenario setup and accessibility analysis")]
struct Cli {
    /// Config file to use instead of `ram.toml`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the scenario's road network and publish its admin boundaries
    Setup {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        scenario: i64,
    },
    /// Print the scenario's accessibility curves as JSON
    Analysis {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        scenario: i64,
    },
    /// Print one page of the scenario's raw results as JSON
    RawResults {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        scenario: i64,
        /// Column to sort by (`origin_id`, `origin_name`, `aa_id`,
        /// `aa_name`, `pop_value`, `poi_type`, `time_to_poi`)
        #[arg(long, default_value = "origin_name")]
        sort_by: RawResultsSort,
        /// `asc` or `desc`
        #[arg(long, default_value = "asc")]
        sort_dir: SortDirection,
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Rows per page
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Zip the scenario's exported result files
    Results {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        scenario: i64,
        /// `csv` or `geojson`
        #[arg(long = "type")]
        format: ResultsFormat,
        /// Archive path, defaults to `results-{type}-p{project}s{scenario}.zip`
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<Config, ram_config::ConfigError> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(&path)?;
            config.apply_env(|name| std::env::var(name).ok())?;
            Ok(config)
        }
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = load_config(cli.config)?;
    let db = services::open_db(&config)?;

    match cli.command {
        Commands::Setup { project, scenario } => {
            let start = Instant::now();
            let setup = services::setup_services(&config, db);

            let outcome =
                ram_setup::run_setup(setup, project, scenario, config.setup_timeout()).await?;

            log::info!(
                "Setup of p{project} s{scenario} finished in {:.1}s: {} ({} bytes, editing {})",
                start.elapsed().as_secs_f64(),
                outcome.path,
                outcome.size_bytes,
                outcome.active_editing
            );

            if let Some(tiles) = outcome.vector_tiles {
                log::info!("Waiting for vector tiles...");
                tiles.await?;
            }
        }
        Commands::Analysis { project, scenario } => {
            let curves = ram_analysis::compute(&db, project, scenario).await?;
            println!("{}", serde_json::to_string_pretty(&curves)?);
        }
        Commands::RawResults {
            project,
            scenario,
            sort_by,
            sort_dir,
            page,
            limit,
        } => {
            let query = RawResultsQuery {
                sort_by,
                sort_dir,
                page,
                limit,
            };
            let page = ram_analysis::raw_results(&db, project, scenario, query).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Results {
            project,
            scenario,
            format,
            output,
        } => {
            let storage = services::blob_store(&config.storage);
            let archive =
                ram_analysis::results_archive(&db, storage.as_ref(), project, scenario, format)
                    .await?;

            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!("results-{format}-p{project}s{scenario}.zip"))
            });
            tokio::fs::write(&output, &archive).await?;
            log::info!("Wrote {} ({} bytes)", output.display(), archive.len());
        }
    }

    Ok(())
}
