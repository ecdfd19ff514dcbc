//! CLI for the imgshield classification layer.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imgshield_core::config;
use imgshield_core::pipeline::ClassificationPipeline;
use imgshield_core::store::{PersistentStore, SqliteStore};

use commands::{run_batch, run_classify, run_stats, run_sweep};

/// Top-level CLI for imgshield.
#[derive(Debug, Parser)]
#[command(name = "imgshield")]
#[command(about = "imgshield: resilient two-stage image classification", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Classify one image file.
    Classify {
        /// Path to the image.
        path: PathBuf,
        /// Cache identifier (defaults to the content's SHA-256).
        #[arg(long)]
        id: Option<String>,
        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify several image files, a few at a time.
    Batch {
        /// Paths to the images.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Run one maintenance pass: cache sweep, expired-record trim, stale-history trim.
    Sweep,

    /// Show learned endpoint timeouts and store size.
    Stats,
}

/// Persistent store, or `None` (memory only) when it cannot be opened.
async fn open_store() -> Option<Arc<dyn PersistentStore>> {
    match SqliteStore::open_default().await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "store unavailable; results will not persist");
            None
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!(
            fingerprint = cfg.backends.fingerprint.is_some(),
            deep = cfg.backends.deep.len(),
            "loaded config"
        );
        let store = open_store().await;
        let pipeline = ClassificationPipeline::open(&cfg, store)
            .await
            .with_configured_backends(&cfg.backends)?;

        match cli.command {
            CliCommand::Classify { path, id, json } => {
                run_classify(&pipeline, &path, id.as_deref(), json).await?
            }
            CliCommand::Batch { paths, json } => run_batch(&pipeline, &paths, json).await?,
            CliCommand::Sweep => run_sweep(&pipeline).await?,
            CliCommand::Stats => run_stats(&pipeline).await?,
        }

        Ok(())
    }
}
