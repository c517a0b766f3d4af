//! CLI entry point for the county realignment pipeline.
//!
//! Provides subcommands for downloading the source files, running the
//! merge-and-derive pipeline, and publishing its outputs to S3.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use county_realign::config::SourceManifest;
use county_realign::fetch::{BasicClient, fetch_sources};
use county_realign::output::write_outputs;
use county_realign::pipeline::{PipelineContext, run};
use county_realign::publish::publish_outputs;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "county_realign")]
#[command(about = "Merge county election, turnout and urbanicity data into analysis tables", long_about = None)]
struct Cli {
    /// JSON source manifest; built-in defaults are used when absent
    #[arg(long, global = true, env = "COUNTY_SOURCES")]
    sources: Option<PathBuf>,

    /// Directory holding the downloaded source files
    #[arg(short, long, global = true, env = "COUNTY_DATA_DIR", default_value = "data/raw")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every source that has a URL in the manifest
    Fetch,
    /// Run the pipeline and write the analysis tables
    Run {
        /// Directory to write CSV tables and the run manifest to
        #[arg(short, long, env = "COUNTY_OUTPUT_DIR", default_value = "data/processed")]
        output_dir: PathBuf,
    },
    /// Upload a run's output directory to S3
    Publish {
        /// Directory containing the run's outputs
        #[arg(short, long, env = "COUNTY_OUTPUT_DIR", default_value = "data/processed")]
        output_dir: PathBuf,

        /// S3 bucket name to upload to (e.g., "my-bucket")
        #[arg(long, env = "S3_BUCKET")]
        s3_bucket: String,

        /// Key prefix inside the bucket
        #[arg(long, default_value = "")]
        prefix: String,

        /// Gzip compress CSV files before uploading
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/county_realign.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("county_realign.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let manifest = match &cli.sources {
        Some(path) => SourceManifest::load(path)
            .with_context(|| format!("failed to read source manifest {}", path.display()))?,
        None => SourceManifest::default(),
    };

    match cli.command {
        Commands::Fetch => {
            let client = BasicClient::new()?;
            let written = fetch_sources(&client, &manifest, &cli.data_dir).await?;
            info!(files = written.len(), "Fetch complete");
        }
        Commands::Run { output_dir } => {
            let ctx = PipelineContext::load(&manifest, &cli.data_dir)
                .with_context(|| format!("failed to load sources from {}", cli.data_dir.display()))?;
            let tables = run(&ctx)?;

            if !tables.malformed_keys.is_empty() {
                warn!(
                    count = tables.malformed_keys.len(),
                    keys = ?tables.malformed_keys,
                    "Counties with malformed FIPS keys kept for inspection"
                );
            }

            let run_manifest = write_outputs(&output_dir, &tables)?;
            info!(
                output_dir = %output_dir.display(),
                tables = run_manifest.tables.len(),
                "Run complete"
            );
        }
        Commands::Publish {
            output_dir,
            s3_bucket,
            prefix,
            gzip,
        } => {
            if s3_bucket.is_empty() {
                info!("S3 bucket not specified, skipping upload");
            } else {
                let config = aws_config::load_from_env().await;
                let s3 = aws_sdk_s3::Client::new(&config);
                publish_outputs(&s3, &s3_bucket, &prefix, &output_dir, gzip).await?;
            }
        }
    }

    Ok(())
}
