//! # bushel CLI
//!
//! Command parsing and orchestration only. Fetching, merging and publishing order live in
//! `bushel-core`; this module turns flags and the YAML config into [`FetchOptions`] and
//! [`SyncOptions`], builds the HTTP client and publisher, and reports the outcome.
//!
//! Precedence for fetch toggles: a `--no-*` flag always wins, then the config file, then
//! the defaults (everything on).
use crate::load_config::{load_config, CliConfig, PUBLISH_TOKEN_ENV};
use crate::publish::HttpPublisher;
use anyhow::{Context, Result};
use bushel_core::synchronise::{synchronise, SyncOptions, SyncReport};
use bushel_core::{FetchOptions, FetchResult, Pipeline};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// CLI for bushel: aggregate macOS restore image, Xcode and Swift metadata.
#[derive(Parser)]
#[clap(
    name = "bushel",
    version,
    about = "Aggregate macOS restore image, Xcode and Swift release metadata and publish it"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every source and publish the result to the configured store
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Fetch and plan batches without publishing anything
        #[clap(long)]
        dry_run: bool,
        #[clap(flatten)]
        fetch: FetchArgs,
    },
    /// Fetch every source and write the result as JSON
    Export {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Output file; stdout when omitted
        #[clap(long)]
        output: Option<PathBuf>,
        #[clap(flatten)]
        fetch: FetchArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Ignore the fetch gate and hit every enabled source
    #[clap(long)]
    pub force: bool,
    /// Fetch only from the source with this id (e.g. appledb.dev)
    #[clap(long = "source", value_name = "ID")]
    pub only_source: Option<String>,
    #[clap(long)]
    pub no_restore_images: bool,
    #[clap(long)]
    pub no_xcode: bool,
    #[clap(long)]
    pub no_swift: bool,
    /// Skip beta and release-candidate sources
    #[clap(long)]
    pub no_betas: bool,
    /// Skip community wiki sources
    #[clap(long)]
    pub no_wiki: bool,
    /// Skip signing-status enrichment
    #[clap(long)]
    pub no_signing: bool,
}

impl FetchArgs {
    /// Applies the flags on top of options loaded from the config file.
    pub fn apply(&self, mut options: FetchOptions) -> FetchOptions {
        options.force |= self.force;
        if self.only_source.is_some() {
            options.only_source = self.only_source.clone();
        }
        options.include_restore_images &= !self.no_restore_images;
        options.include_xcode_versions &= !self.no_xcode;
        options.include_swift_versions &= !self.no_swift;
        options.include_betas &= !self.no_betas;
        options.include_community_wiki &= !self.no_wiki;
        options.include_signing_verification &= !self.no_signing;
        options
    }
}

/// Builds the shared HTTP client. Some upstream APIs reject requests without a user agent.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("bushel/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

async fn fetch(config: &CliConfig, args: &FetchArgs, client: reqwest::Client) -> Result<FetchResult> {
    let options = args.apply(config.fetch.to_options());
    let pipeline = Pipeline::standard(client, config.secrets.virtualbuddy_api_key.clone());
    let result = pipeline.fetch(&options).await?;
    Ok(result)
}

fn print_report(report: &SyncReport) {
    let mode = if report.dry_run { "dry run" } else { "published" };
    println!("Synchronise report ({mode}):");
    for kind in &report.kinds {
        println!(
            "  {}: {} records in {} batches, {} accepted",
            kind.kind, kind.records, kind.batches, kind.accepted
        );
    }
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            config,
            dry_run,
            fetch: args,
        } => {
            let config = load_config(config)?;
            let publish = config
                .publish
                .clone()
                .context("sync requires a `publish` section in the config file")?;
            let token = match (&config.secrets.publish_token, dry_run) {
                (Some(token), _) => token.clone(),
                (None, true) => String::new(),
                (None, false) => anyhow::bail!("{PUBLISH_TOKEN_ENV} must be set to publish"),
            };
            tracing::info!(command = "sync", dry_run, "Starting synchronisation process");

            let client = http_client()?;
            let result = fetch(&config, &args, client.clone()).await?;
            let publisher = HttpPublisher::new(client, publish.endpoint, token);
            let options = SyncOptions {
                dry_run,
                batch_size: publish.batch_size,
            };

            match synchronise(&result, &publisher, &options).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    print_report(&report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Export {
            config,
            output,
            fetch: args,
        } => {
            let config = load_config(config)?;
            tracing::info!(command = "export", ?output, "Starting export");

            let result = fetch(&config, &args, http_client()?).await?;
            let json = serde_json::to_string_pretty(&result)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write export to {}", path.display()))?,
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{json}")?;
                }
            }
            tracing::info!(command = "export", records = result.total(), "Export complete");
            Ok(())
        }
    }
}
