//! Level II radar ingester.
//!
//! Ingests real-time chunk files from disk and writes completed scans as JSON.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use radar_ingester::{IngesterConfig, IngestionPipeline};

#[derive(Parser, Debug)]
#[command(name = "radar-ingester")]
#[command(about = "Assembles NEXRAD/TDWR Level II chunks into completed scans")]
struct Args {
    /// Chunk files or directories to ingest
    #[arg(short, long, num_args = 1.., env = "INGESTER_INPUTS", value_delimiter = ',')]
    input: Vec<PathBuf>,

    /// Output directory for scan JSON
    #[arg(short, long, env = "INGESTER_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Process one site at a time
    #[arg(long)]
    sequential: bool,

    /// Sites processed concurrently
    #[arg(long, env = "INGESTER_PARALLEL_SITES")]
    parallel: Option<usize>,

    /// Configuration file (YAML)
    #[arg(short, long, env = "INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if args.json_logs {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }

    info!("Starting Level II ingester");

    let mut config = match &args.config {
        Some(path) => IngesterConfig::from_yaml(path)?,
        None => IngesterConfig::from_env(),
    };
    if !args.input.is_empty() {
        config.inputs = args.input;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(parallel) = args.parallel {
        config.parallel_sites = parallel;
    }
    config.sequential |= args.sequential;
    config.validate()?;

    info!(
        inputs = config.inputs.len(),
        output = %config.output_dir.display(),
        concurrency = config.concurrency(),
        "Loaded configuration"
    );

    let summary = IngestionPipeline::new(config).run().await?;
    if summary.failed > 0 {
        anyhow::bail!(
            "{} of {} files failed to ingest",
            summary.failed,
            summary.files
        );
    }

    Ok(())
}
