//! Name indexer CLI
//!
//! Runs one indexing cycle, or keeps repeating it with `--daemon`.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use name_indexer::{
    Crawler, Cycle, DocumentStore, EntrySource, FileDumpCycle, FileSink, GenerationManager,
    HttpDirectory, HttpProfileResolver, HttpTransport, Scheduler, SqliteStore, StoreIndexCycle,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "name-indexer")]
#[command(about = "Crawls the name directory and builds the search index")]
struct Cli {
    /// Repeat the cycle every `minutes_between_index` until interrupted
    #[arg(short, long)]
    daemon: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl and write the names and profiles JSON files
    FetchToJson,

    /// Build a new index generation in the store and publish it
    Index {
        /// Index the files written by fetch-to-json instead of crawling
        #[arg(long)]
        from_files: bool,
    },

    /// Copy the prior generation back over the current one
    RestorePrior,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,name_indexer=info,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    info!(
        api_url = %config.api_url,
        store_url = %config.store_url,
        daemon = cli.daemon,
        "Starting name indexer"
    );

    let cycle: Arc<dyn Cycle> = match cli.command {
        Commands::FetchToJson => Arc::new(FileDumpCycle::new(crawler(&config)?, file_sink(&config))),
        Commands::Index { from_files } => {
            let source = if from_files {
                EntrySource::Dump(file_sink(&config))
            } else {
                EntrySource::Crawl(crawler(&config)?)
            };
            let generations = GenerationManager::new(open_store(&config).await?);
            Arc::new(StoreIndexCycle::new(source, generations))
        }
        Commands::RestorePrior => {
            let generations = GenerationManager::new(open_store(&config).await?);
            generations
                .restore_prior()
                .await
                .context("Failed to restore prior generation")?;
            return Ok(());
        }
    };

    let scheduler = Scheduler::new(cycle, config.index_interval());

    if cli.daemon {
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
            signal.cancel();
        });

        scheduler.run(shutdown).await;
    } else {
        scheduler
            .run_once()
            .await
            .context("Indexing cycle failed")?;
    }

    Ok(())
}

fn crawler(config: &Config) -> Result<Crawler> {
    let transport = HttpTransport::new(&config.api_url, config.max_simultaneous_fetches)
        .context("Failed to create HTTP transport")?;

    Ok(Crawler::new(
        Arc::new(HttpDirectory::new(transport.clone())),
        Arc::new(HttpProfileResolver::new(transport)),
        config.crawl_config(),
    ))
}

fn file_sink(config: &Config) -> FileSink {
    FileSink::new(&config.profiles_file, &config.names_file)
}

async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store = SqliteStore::new(&config.store_url)
        .await
        .with_context(|| format!("Failed to open store at {}", config.store_url))?;
    Ok(Arc::new(store))
}
