use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use afriscan_scraper::apis::listing_crawler::HtmlListingCrawler;
use afriscan_scraper::app::ports::ListingStorePort;
use afriscan_scraper::app::scrape_use_case::ScrapeUseCase;
use afriscan_scraper::config::Config;
use afriscan_scraper::export::write_csv_file;
use afriscan_scraper::pipeline::processing::normalize::ListingNormalizer;
use afriscan_scraper::server::{start_server, AppState};
use afriscan_scraper::storage::SqliteStorage;
use afriscan_scraper::{logging, metrics};

#[derive(Parser)]
#[command(name = "afriscan_scraper")]
#[command(about = "Real-estate listing scraper and feasibility normalizer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every configured source once and store the results
    Run {
        #[arg(long, default_value = "cli")]
        triggered_by: String,
    },
    /// Serve the dashboard API
    Serve {
        /// Overrides `[server] port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write stored listings as CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// List configured sources
    Sources,
}

fn build_use_case(config: &Config, store: Arc<dyn ListingStorePort>) -> anyhow::Result<ScrapeUseCase> {
    let crawler = Arc::new(HtmlListingCrawler::new(&config.scrape)?);
    Ok(ScrapeUseCase::new(
        config.sources.clone(),
        crawler,
        store,
        Box::new(ListingNormalizer::from_config(&config.normalize)),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    logging::init_logging(&config.logging);
    metrics::init_metrics();

    match cli.command {
        Commands::Run { triggered_by } => {
            let store: Arc<dyn ListingStorePort> =
                Arc::new(SqliteStorage::open(&config.storage.database_path)?);
            let use_case = build_use_case(&config, store)?;

            match use_case.run_scrape(&triggered_by).await {
                Ok(result) => {
                    println!("\n📊 Scrape run {}:", result.run_id);
                    println!("   Listings: {}", result.listings.len());
                    println!("   Errors: {}", result.errors.len());
                    if !result.errors.is_empty() {
                        warn!("{} sources failed during run", result.errors.len());
                        println!("\n⚠️  Errors encountered:");
                        for e in &result.errors {
                            println!("   - {e}");
                        }
                    }
                }
                Err(e) => {
                    error!("Scrape run failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Serve { port } => {
            let store: Arc<dyn ListingStorePort> =
                Arc::new(SqliteStorage::open(&config.storage.database_path)?);
            let use_case = build_use_case(&config, store.clone())?;
            let state = AppState {
                scrape: Arc::new(use_case),
                store,
            };
            start_server(state, port.unwrap_or(config.server.port)).await?;
        }
        Commands::Export { out } => {
            let store = SqliteStorage::open(&config.storage.database_path)?;
            let listings = store.list_listings().await?;
            write_csv_file(&out, &listings)?;
            println!("✅ Exported {} listings to {}", listings.len(), out.display());
        }
        Commands::Sources => {
            info!("{} sources configured", config.sources.len());
            for source in &config.sources {
                println!("{} ({})", source.label, source.id);
                for url in &source.entry_urls {
                    println!("   {url}");
                }
            }
        }
    }

    Ok(())
}
