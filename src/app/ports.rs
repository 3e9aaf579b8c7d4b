use async_trait::async_trait;

use crate::config::ScrapeSource;
use crate::error::Result;
use crate::types::{NormalizedListing, RawListing, RunSummary, StoredListing};

/// Fetches one source's pages and cuts them into raw listings.
#[async_trait]
pub trait CrawlerPort: Send + Sync {
    async fn crawl(&self, source: &ScrapeSource) -> Result<Vec<RawListing>>;
}

/// Where normalized listings and run bookkeeping end up.
///
/// `upsert` is keyed on `listing.hash`: writing the same hash twice replaces
/// the earlier row.
#[async_trait]
pub trait ListingStorePort: Send + Sync {
    async fn upsert(&self, listing: &NormalizedListing, run_id: &str) -> Result<()>;

    async fn record_run_summary(&self, summary: &RunSummary) -> Result<()>;

    async fn list_listings(&self) -> Result<Vec<StoredListing>>;

    async fn get_listing(&self, hash: &str) -> Result<Option<StoredListing>>;

    /// Overwrite a stored row as-is (used by manual overrides).
    async fn replace_listing(&self, stored: &StoredListing) -> Result<()>;

    async fn list_runs(&self) -> Result<Vec<RunSummary>>;
}
