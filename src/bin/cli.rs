//! notion-cache CLI
//!
//! Local execution entry point. For AWS Lambda, use `notion-cache-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use notion_cache::{
    config,
    error::{AppError, Result},
    models::{Config, SearchParams},
    pipeline::{self, PageSummary},
    services::PageService,
    storage,
};

/// notion-cache - Notion page cache
#[derive(Parser, Debug)]
#[command(
    name = "notion-cache",
    version,
    about = "Read-through cache for Notion pages"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a page through the cache
    Page {
        /// Notion page ID or URL
        page_id: String,

        /// Bypass the cache and fetch from the API
        #[arg(long)]
        live: bool,

        /// Write the record map as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search pages below an ancestor
    Search {
        /// Query text
        query: String,

        /// Ancestor page (default: site root)
        #[arg(long)]
        ancestor: Option<String>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Prime the cache with the root and navigation pages
    Warm,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build the page service over the configured cache store.
async fn build_service(config: &Config) -> Result<PageService> {
    let store = storage::build_store(&config.cache).await?;
    PageService::from_config(config, store)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load_config(&cli.config);
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Page {
            page_id,
            live,
            output,
        } => {
            let service = build_service(&config).await?;
            let record_map = pipeline::run_page(&service, &page_id, live).await?;
            let summary = PageSummary::from_record_map(&record_map);

            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&record_map)?;
                    std::fs::write(&path, json)?;
                    log::info!("Record map saved to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&summary)?),
            }
        }

        Command::Search {
            query,
            ancestor,
            limit,
        } => {
            let ancestor = ancestor.unwrap_or_else(|| config.site.root_page_id.clone());
            if ancestor.trim().is_empty() {
                return Err(AppError::config(
                    "No ancestor given and site.root_page_id is not set",
                ));
            }

            let mut params = SearchParams::new(ancestor, query);
            params.limit = limit;
            let results = build_service(&config).await?.search(&params).await?;
            log::info!("{} of {} results", results.results.len(), results.total);
            println!("{}", serde_json::to_string_pretty(&results.results)?);
        }

        Command::Warm => {
            let service = build_service(&config).await?;
            let stats = pipeline::run_warm(&service, &config).await?;
            log::info!(
                "Warm complete in {}ms",
                (stats.end_time - stats.start_time).num_milliseconds()
            );
            for (page_id, error) in &stats.failed {
                log::warn!("  {}: {}", page_id, error);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK (backend: {:?}, root page: {})",
                config.cache.backend,
                config.site.root_page_id
            );
        }
    }

    log::info!("Done!");
    Ok(())
}
