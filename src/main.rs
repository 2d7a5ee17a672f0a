//! bucketsync - incremental locked sync of a local directory tree to an
//! object store.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bucketsync::auth::{decode_token, Identity};
use bucketsync::hash::persist_manifests;
use bucketsync::store::OpendalStore;
use bucketsync::sync::{sync_down, sync_up, SyncOptions};

#[derive(Parser)]
#[command(
    name = "bucketsync",
    version,
    about = "Incremental locked sync of a local directory tree to an object store"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write per-directory content manifests for a local tree
    Hash {
        /// Directory to hash
        dir: PathBuf,
    },
    /// Sync a local file or directory tree up to the store
    Up {
        /// Local path to sync
        path: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        /// Remote key prefix
        #[arg(short, long, default_value = ".")]
        prefix: String,
        /// Base directory remote paths are made relative to
        #[arg(long, default_value = ".")]
        base: PathBuf,
        /// Upload everything and overwrite an existing lock
        #[arg(short, long)]
        force: bool,
        /// Upload workers (defaults to the CPU count)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Mirror a remote prefix into a local directory
    Down {
        /// Local destination directory
        path: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        /// Remote key prefix
        #[arg(short, long, default_value = ".")]
        prefix: String,
        /// Download workers (defaults to the CPU count)
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

#[derive(Args)]
struct StoreArgs {
    /// Store service
    #[arg(long, value_enum, default_value = "s3")]
    service: Service,
    /// Bucket name
    #[arg(long)]
    bucket: String,
    /// Region (S3)
    #[arg(long, default_value = "us-east-1")]
    region: String,
    /// Custom endpoint for S3-compatible stores
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Service {
    S3,
    Gcs,
}

impl StoreArgs {
    fn build(&self) -> Result<OpendalStore> {
        match self.service {
            Service::S3 => OpendalStore::s3(&self.bucket, &self.region, self.endpoint.as_deref()),
            Service::Gcs => OpendalStore::gcs(&self.bucket),
        }
    }
}

/// Identity for lock/log attribution, from the BUCKETSYNC_TOKEN bearer token
/// if one is set.
fn identity_from_env() -> Result<Identity> {
    match std::env::var("BUCKETSYNC_TOKEN") {
        Ok(token) => decode_token(&token).context("failed to decode BUCKETSYNC_TOKEN"),
        Err(_) => Ok(Identity {
            sub: "anonymous".to_string(),
            name: "Name unset".to_string(),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Hash { dir } => {
            persist_manifests(&dir)?;
            println!("hashed {}", dir.display());
        }
        Commands::Up {
            path,
            store,
            prefix,
            base,
            force,
            workers,
        } => {
            let store = store.build()?;
            let mut opts = SyncOptions::new(identity_from_env()?);
            opts.force = force;
            if let Some(workers) = workers {
                opts.workers = workers;
            }
            sync_up(&store, &path, &prefix, &base, &opts).await?;
        }
        Commands::Down {
            path,
            store,
            prefix,
            workers,
        } => {
            let store = store.build()?;
            sync_down(&store, &path, &prefix, workers.unwrap_or_else(num_cpus::get)).await?;
        }
    }
    Ok(())
}
