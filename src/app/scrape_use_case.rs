use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::app::ports::{CrawlerPort, ListingStorePort};
use crate::config::ScrapeSource;
use crate::error::Result;
use crate::metrics::scrape as scrape_metrics;
use crate::pipeline::processing::normalize::{ListingNormalizer, Normalizer};
use crate::types::{NormalizedListing, RunResult, RunStatus, RunSummary};

/// Use case for one scrape run across every configured source
pub struct ScrapeUseCase {
    sources: Vec<ScrapeSource>,
    crawler: Arc<dyn CrawlerPort>,
    store: Arc<dyn ListingStorePort>,
    normalizer: Box<dyn Normalizer>,
}

impl ScrapeUseCase {
    pub fn new(
        sources: Vec<ScrapeSource>,
        crawler: Arc<dyn CrawlerPort>,
        store: Arc<dyn ListingStorePort>,
        normalizer: Box<dyn Normalizer>,
    ) -> Self {
        Self {
            sources,
            crawler,
            store,
            normalizer,
        }
    }

    /// Create a use case with the default baselines
    pub fn with_default_normalizer(
        sources: Vec<ScrapeSource>,
        crawler: Arc<dyn CrawlerPort>,
        store: Arc<dyn ListingStorePort>,
    ) -> Self {
        Self::new(sources, crawler, store, Box::new(ListingNormalizer::default()))
    }

    /// Crawl, normalize and persist every source in order.
    ///
    /// A source whose crawl fails contributes a `"{id}: {message}"` entry to
    /// `errors` and the run moves on. A store failure ends the run with `Err`
    /// and records it in the failed summary as `"{id}: persistence: {message}"`.
    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn run_scrape(&self, triggered_by: &str) -> Result<RunResult> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let timer = std::time::Instant::now();
        scrape_metrics::run_started(triggered_by);

        let mut summary = RunSummary {
            run_id: run_id.clone(),
            triggered_by: triggered_by.to_string(),
            status: RunStatus::Running,
            started_at,
            completed_at: None,
            total_sources: self.sources.len(),
            processed_listings: 0,
            error_count: 0,
            errors: Vec::new(),
        };
        self.store.record_run_summary(&summary).await?;
        info!(run_id = %run_id, "🚀 Starting scrape run");

        let mut listings: Vec<NormalizedListing> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for source in &self.sources {
            if let Err(e) = self
                .process_source(source, &run_id, &mut listings, &mut errors)
                .await
            {
                error!(run_id = %run_id, source = %source.id, "Persistence failed: {}", e);
                summary.status = RunStatus::Failed;
                summary.completed_at = Some(Utc::now());
                summary.processed_listings = listings.len();
                summary.error_count = errors.len() + 1;
                summary.errors = errors.clone();
                summary.errors.push(format!("{}: persistence: {}", source.id, e));
                if let Err(record_err) = self.store.record_run_summary(&summary).await {
                    warn!("Could not record failed run summary: {}", record_err);
                }
                return Err(e);
            }
        }

        let completed_at = Utc::now();
        summary.status = RunStatus::Completed;
        summary.completed_at = Some(completed_at);
        summary.processed_listings = listings.len();
        summary.error_count = errors.len();
        summary.errors = errors.clone();
        self.store.record_run_summary(&summary).await?;

        scrape_metrics::run_duration(timer.elapsed().as_secs_f64());
        info!(
            run_id = %run_id,
            "✅ Scrape run finished: {} listings, {} errors",
            listings.len(),
            errors.len()
        );

        Ok(RunResult {
            run_id,
            triggered_by: triggered_by.to_string(),
            started_at,
            completed_at,
            listings,
            errors,
        })
    }

    /// Crawl errors are recorded and swallowed; store errors are returned.
    async fn process_source(
        &self,
        source: &ScrapeSource,
        run_id: &str,
        listings: &mut Vec<NormalizedListing>,
        errors: &mut Vec<String>,
    ) -> Result<()> {
        info!(source = %source.id, "📡 Crawling {}", source.label);

        let raw_listings = match self.crawler.crawl(source).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source = %source.id, "Crawl failed: {}", e);
                scrape_metrics::source_failed(&source.id);
                errors.push(format!("{}: {}", source.id, e));
                return Ok(());
            }
        };

        info!(source = %source.id, "Fetched {} raw listings", raw_listings.len());

        for raw in &raw_listings {
            let normalized = self.normalizer.normalize(raw);
            debug!(
                hash = %normalized.hash,
                feasibility = %normalized.feasibility,
                flags = ?normalized.flags,
                "Normalized listing"
            );
            scrape_metrics::listing_normalized(&source.id);
            for flag in &normalized.flags {
                scrape_metrics::flag_recorded(flag);
            }

            self.store.upsert(&normalized, run_id).await?;
            listings.push(normalized);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ListingStorePort;
    use crate::config::{builtin_sources, SourceSelectors};
    use crate::error::ScraperError;
    use crate::storage::InMemoryStorage;
    use crate::types::{RawListing, StoredListing};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Hands out canned listings per source id; unknown ids fail.
    struct MockCrawler {
        listings: HashMap<String, Vec<RawListing>>,
        calls: Arc<tokio::sync::Mutex<Vec<String>>>,
    }

    impl MockCrawler {
        fn new(listings: HashMap<String, Vec<RawListing>>) -> Self {
            Self {
                listings,
                calls: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl CrawlerPort for MockCrawler {
        async fn crawl(&self, source: &ScrapeSource) -> Result<Vec<RawListing>> {
            self.calls.lock().await.push(source.id.clone());
            self.listings
                .get(&source.id)
                .cloned()
                .ok_or_else(|| ScraperError::Status {
                    status: 503,
                    url: source.entry_urls.first().cloned().unwrap_or_default(),
                })
        }
    }

    /// Store that accepts run summaries but refuses every listing.
    struct UnreachableStore {
        summaries: Arc<tokio::sync::Mutex<Vec<RunSummary>>>,
    }

    #[async_trait]
    impl ListingStorePort for UnreachableStore {
        async fn upsert(&self, _listing: &NormalizedListing, _run_id: &str) -> Result<()> {
            Err(ScraperError::Storage("store unreachable".into()))
        }

        async fn record_run_summary(&self, summary: &RunSummary) -> Result<()> {
            self.summaries.lock().await.push(summary.clone());
            Ok(())
        }

        async fn list_listings(&self) -> Result<Vec<StoredListing>> {
            Ok(Vec::new())
        }

        async fn get_listing(&self, _hash: &str) -> Result<Option<StoredListing>> {
            Ok(None)
        }

        async fn replace_listing(&self, _stored: &StoredListing) -> Result<()> {
            Ok(())
        }

        async fn list_runs(&self) -> Result<Vec<RunSummary>> {
            Ok(self.summaries.lock().await.clone())
        }
    }

    fn source(id: &str) -> ScrapeSource {
        ScrapeSource {
            id: id.to_string(),
            label: format!("{id} label"),
            entry_urls: vec![format!("https://{id}.example/listings")],
            selectors: SourceSelectors {
                card: ".card".to_string(),
                ..Default::default()
            },
            location_hints: Vec::new(),
        }
    }

    fn raw(source_id: &str, title: &str) -> RawListing {
        RawListing {
            source_id: source_id.to_string(),
            source_label: format!("{source_id} label"),
            url: format!("https://{source_id}.example/listings"),
            html_snippet: format!("<div>{title}</div>"),
            title: Some(title.to_string()),
            price_text: Some("₦200,000,000".to_string()),
            rent_text: Some("₦1,000,000".to_string()),
            unit_text: Some("90 units".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_run() {
        let mut canned = HashMap::new();
        canned.insert("alpha".to_string(), vec![raw("alpha", "A1"), raw("alpha", "A2")]);
        canned.insert("gamma".to_string(), vec![raw("gamma", "G1")]);
        let crawler = Arc::new(MockCrawler::new(canned));
        let calls = crawler.calls.clone();
        let store = Arc::new(InMemoryStorage::new());

        let use_case = ScrapeUseCase::with_default_normalizer(
            vec![source("alpha"), source("beta"), source("gamma")],
            crawler,
            store.clone(),
        );

        let result = use_case.run_scrape("test").await.unwrap();

        assert_eq!(result.listings.len(), 3);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("beta: "));
        assert_eq!(*calls.lock().await, vec!["alpha", "beta", "gamma"]);

        let stored = store.list_listings().await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|s| s.run_id == result.run_id));

        let runs = store.list_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert_eq!(runs[0].processed_listings, 3);
        assert_eq!(runs[0].error_count, 1);
    }

    #[tokio::test]
    async fn test_every_source_failing_still_returns_result() {
        let crawler = Arc::new(MockCrawler::new(HashMap::new()));
        let store = Arc::new(InMemoryStorage::new());
        let use_case =
            ScrapeUseCase::with_default_normalizer(builtin_sources(), crawler, store);

        let result = use_case.run_scrape("scheduler").await.unwrap();

        assert!(result.listings.is_empty());
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("propertypro_ng: "));
        assert!(result.errors[1].starts_with("meqasa_gh: "));
        assert_eq!(result.triggered_by, "scheduler");
    }

    #[tokio::test]
    async fn test_rescrape_upserts_in_place() {
        let mut canned = HashMap::new();
        canned.insert("alpha".to_string(), vec![raw("alpha", "A1")]);
        let crawler = Arc::new(MockCrawler::new(canned));
        let store = Arc::new(InMemoryStorage::new());
        let use_case =
            ScrapeUseCase::with_default_normalizer(vec![source("alpha")], crawler, store.clone());

        let first = use_case.run_scrape("first").await.unwrap();
        let second = use_case.run_scrape("second").await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.listings[0].hash, second.listings[0].hash);
        let stored = store.list_listings().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let mut canned = HashMap::new();
        canned.insert("alpha".to_string(), vec![raw("alpha", "A1")]);
        let crawler = Arc::new(MockCrawler::new(canned));
        let summaries = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let store = Arc::new(UnreachableStore {
            summaries: summaries.clone(),
        });
        let use_case =
            ScrapeUseCase::with_default_normalizer(vec![source("alpha")], crawler, store);

        let result = use_case.run_scrape("test").await;

        assert!(matches!(result, Err(ScraperError::Storage(_))));
        let summaries = summaries.lock().await;
        let failed = summaries.last().unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.error_count, 1);
        assert!(failed.errors[0].starts_with("alpha: persistence: "));
    }
}
