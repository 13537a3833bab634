//! boardindex CLI
//!
//! Local entry point for refreshing and inspecting the cached forum catalog.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use boardindex::{
    crawler::HttpFetcher,
    error::Result,
    models::{Config, TOP_LEVEL_PARENT_ID},
    repository::{ForumRepository, UpdateOutcome},
    storage::{ForumStore, LocalStore},
    structure::{ForumStructure, ListFormat},
};

/// boardindex - Forum Index Catalog Crawler
#[derive(Parser, Debug)]
#[command(
    name = "boardindex",
    version,
    about = "Maintains a cached catalog of a discussion board's forum index"
)]
struct Cli {
    /// Path to storage directory containing config and cached records
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the catalog by crawling the board
    Refresh,

    /// Print the cached catalog
    Show {
        /// Output shape
        #[arg(long, value_enum, default_value_t = ShowFormat::Tree)]
        format: ShowFormat,

        /// Leave out the section headers
        #[arg(long)]
        no_sections: bool,
    },

    /// Remove all cached forum data
    Clear,

    /// Validate configuration files
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ShowFormat {
    /// Full nested hierarchy
    Tree,
    /// Entries with their subtrees collapsed to one level
    TwoLevel,
    /// Single flat sequence
    Flat,
}

impl From<ShowFormat> for ListFormat {
    fn from(format: ShowFormat) -> Self {
        match format {
            ShowFormat::Tree => ListFormat::FullTree,
            ShowFormat::TwoLevel => ListFormat::TwoLevel,
            ShowFormat::Flat => ListFormat::Flat,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Arc::new(Config::load_or_default(&config_path));
    let store = Arc::new(LocalStore::new(&cli.storage_dir));

    match cli.command {
        Command::Refresh => {
            config.validate()?;
            let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
            let repository = ForumRepository::new(Arc::clone(&config), fetcher, store);

            log::info!("Refreshing forum catalog from {}", config.crawler.base_url);
            match repository.update_forums().await? {
                UpdateOutcome::Refreshed => {
                    let structure = repository.forum_structure().await?;
                    log::info!("Catalog refreshed - {} forums cached", structure.node_count());
                }
                UpdateOutcome::AlreadyRunning => {
                    log::warn!("A refresh is already in progress");
                }
            }
        }

        Command::Show { format, no_sections } => {
            let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
            let repository = ForumRepository::new(Arc::clone(&config), fetcher, store);

            let structure = repository.forum_structure().await?;
            if structure.is_empty() {
                log::info!("No catalog cached yet. Run 'refresh' first.");
                return Ok(());
            }

            let list = structure
                .as_list()
                .include_sections(!no_sections)
                .format(format.into())
                .build();
            let view = ForumStructure::build_from_tree(&list, TOP_LEVEL_PARENT_ID);
            println!("{}", view.render());
            log::info!("{} forums cached", structure.node_count());
        }

        Command::Clear => {
            store.clear_all().await?;
            log::info!("Cached forum data cleared");
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }
    }

    Ok(())
}
