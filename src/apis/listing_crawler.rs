use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::CrawlerPort;
use crate::config::{ScrapeConfig, ScrapeSource, SourceSelectors};
use crate::error::{Result, ScraperError};
use crate::types::RawListing;

/// Crawler for listing sites described by CSS selectors.
pub struct HtmlListingCrawler {
    client: reqwest::Client,
    snippet_limit: usize,
}

impl HtmlListingCrawler {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            snippet_limit: config.snippet_limit,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CrawlerPort for HtmlListingCrawler {
    #[instrument(skip(self, source), fields(source = %source.id))]
    async fn crawl(&self, source: &ScrapeSource) -> Result<Vec<RawListing>> {
        let mut listings = Vec::new();
        for url in &source.entry_urls {
            let html = self.fetch_page(url).await?;
            let page = parse_listing_page(source, url, &html, self.snippet_limit)?;
            info!("Parsed {} listings from {}", page.len(), url);
            listings.extend(page);
        }
        Ok(listings)
    }
}

/// Compiled form of [`SourceSelectors`].
struct CompiledSelectors {
    card: Selector,
    title: Option<Selector>,
    price: Option<Selector>,
    rent: Option<Selector>,
    units: Option<Selector>,
    location: Option<Selector>,
    building_type: Option<Selector>,
}

impl CompiledSelectors {
    fn compile(selectors: &SourceSelectors) -> Result<Self> {
        Ok(Self {
            card: compile(&selectors.card)?,
            title: compile_opt(selectors.title.as_deref())?,
            price: compile_opt(selectors.price.as_deref())?,
            rent: compile_opt(selectors.rent.as_deref())?,
            units: compile_opt(selectors.units.as_deref())?,
            location: compile_opt(selectors.location.as_deref())?,
            building_type: compile_opt(selectors.building_type.as_deref())?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScraperError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn compile_opt(selector: Option<&str>) -> Result<Option<Selector>> {
    selector.map(compile).transpose()
}

/// Cut one fetched page into raw listings.
///
/// Each card matched by `selectors.card` becomes a listing whose snippet is
/// the card's inner HTML. A page with no cards yields a single fallback
/// listing carrying the page head as snippet and the source's location
/// hints as location text.
pub fn parse_listing_page(
    source: &ScrapeSource,
    url: &str,
    html: &str,
    snippet_limit: usize,
) -> Result<Vec<RawListing>> {
    let selectors = CompiledSelectors::compile(&source.selectors)?;
    let document = Html::parse_document(html);

    let cards: Vec<ElementRef> = document.select(&selectors.card).collect();
    if cards.is_empty() {
        warn!(source = %source.id, "No cards matched '{}' on {}", source.selectors.card, url);
        return Ok(vec![RawListing {
            source_id: source.id.clone(),
            source_label: source.label.clone(),
            url: url.to_string(),
            html_snippet: truncate_chars(html, snippet_limit),
            location_text: Some(
                source
                    .location_hints
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            ..Default::default()
        }]);
    }

    debug!("Matched {} cards on {}", cards.len(), url);
    Ok(cards
        .into_iter()
        .map(|card| RawListing {
            source_id: source.id.clone(),
            source_label: source.label.clone(),
            url: url.to_string(),
            html_snippet: truncate_chars(&card.inner_html(), snippet_limit),
            title: field_text(&card, selectors.title.as_ref()),
            price_text: field_text(&card, selectors.price.as_ref()),
            rent_text: field_text(&card, selectors.rent.as_ref()),
            unit_text: field_text(&card, selectors.units.as_ref()),
            location_text: field_text(&card, selectors.location.as_ref()),
            type_text: field_text(&card, selectors.building_type.as_ref()),
        })
        .collect())
}

/// Text of every match inside the card, trimmed. A configured selector that
/// matches nothing gives `Some("")`; an unconfigured one gives `None`.
fn field_text(card: &ElementRef, selector: Option<&Selector>) -> Option<String> {
    let selector = selector?;
    let text: String = card
        .select(selector)
        .flat_map(|el| el.text())
        .collect();
    Some(text.trim().to_string())
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
