use std::path::PathBuf;
use std::sync::Arc;

use structopt::StructOpt;

use vigil::config::Config;
use vigil::output::{self, OutputFormat};
use vigil::pipeline::{run_simulation, IngestionPipeline};
use vigil::store::{DetectionStore, SqliteStore};

/// Vigil brute-force detection service Command Line Interface
#[derive(StructOpt, Debug)]
#[structopt(name = "vigil", about = "Brute-force login detection CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Replay the canned attack fixture against a store
    Simulate {
        /// Path to the SQLite database
        #[structopt(short, long, default_value = "vigil.db")]
        db: PathBuf,
    },
    /// Show current alerts, most recently updated first
    Alerts {
        /// Path to the SQLite database
        #[structopt(short, long, default_value = "vigil.db")]
        db: PathBuf,
        /// Output format: json, jsonl, or console
        #[structopt(short, long, default_value = "console")]
        format: String,
    },
    /// Show recent events, most recent first
    Events {
        /// Path to the SQLite database
        #[structopt(short, long, default_value = "vigil.db")]
        db: PathBuf,
        /// Number of events to show
        #[structopt(short, long, default_value = "50")]
        limit: usize,
        /// Output format: json, jsonl, or console
        #[structopt(short, long, default_value = "console")]
        format: String,
        /// Mask source, username, and geo fields for display
        #[structopt(long)]
        anonymize: bool,
    },
    /// Show dashboard metrics
    Metrics {
        /// Path to the SQLite database
        #[structopt(short, long, default_value = "vigil.db")]
        db: PathBuf,
        /// Output format: json or console
        #[structopt(short, long, default_value = "console")]
        format: String,
    },
}

fn open_pipeline(db: &PathBuf) -> Result<IngestionPipeline, Box<dyn std::error::Error>> {
    let store: Arc<dyn DetectionStore> = Arc::new(SqliteStore::open(db)?);
    Ok(IngestionPipeline::new(store, Config::default().detection))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Simulate { db } => {
            let pipeline = open_pipeline(&db)?;
            let acks = run_simulation(&pipeline)?;
            println!("Simulated {} login events", acks.len());

            let alerts = pipeline.list_alerts()?;
            print!("{}", output::render_alerts(&alerts, &OutputFormat::Console)?);
        }
        Cli::Alerts { db, format } => {
            let pipeline = open_pipeline(&db)?;
            let alerts = pipeline.list_alerts()?;
            print!(
                "{}",
                output::render_alerts(&alerts, &OutputFormat::from_str(&format))?
            );
        }
        Cli::Events {
            db,
            limit,
            format,
            anonymize,
        } => {
            let pipeline = open_pipeline(&db)?;
            let events = pipeline.recent_events(limit)?;
            print!(
                "{}",
                output::render_events(&events, &OutputFormat::from_str(&format), anonymize)?
            );
        }
        Cli::Metrics { db, format } => {
            let pipeline = open_pipeline(&db)?;
            let metrics = pipeline.metrics()?;
            print!(
                "{}",
                output::render_metrics(&metrics, &OutputFormat::from_str(&format))?
            );
        }
    }

    Ok(())
}
