use crate::constants::{
    DEFAULT_UNIT_COUNT, MEQASA_GH, MEQASA_GH_LABEL, PROPERTYPRO_NG, PROPERTYPRO_NG_LABEL,
    RENT_BASELINE, SNIPPET_LIMIT, USER_AGENT,
};
use crate::error::{Result, ScraperError};
use crate::types::KnownLocation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub normalize: NormalizeConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sources: Vec<ScrapeSource>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub snippet_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub rent_baseline: i64,
    pub default_unit_count: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub default_directive: String,
}

/// One site to crawl: where to start and which selectors pick out the fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScrapeSource {
    pub id: String,
    pub label: String,
    pub entry_urls: Vec<String>,
    pub selectors: SourceSelectors,
    #[serde(default)]
    pub location_hints: Vec<KnownLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceSelectors {
    pub card: String,
    pub title: Option<String>,
    pub price: Option<String>,
    pub rent: Option<String>,
    pub units: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub building_type: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrape: ScrapeConfig::default(),
            normalize: NormalizeConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            sources: builtin_sources(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            timeout_seconds: 30,
            snippet_limit: SNIPPET_LIMIT,
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            rent_baseline: RENT_BASELINE,
            default_unit_count: DEFAULT_UNIT_COUNT,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/afriscan.db"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            default_directive: "afriscan_scraper=info".to_string(),
        }
    }
}

/// The two marketplaces the scraper ships with.
pub fn builtin_sources() -> Vec<ScrapeSource> {
    vec![
        ScrapeSource {
            id: PROPERTYPRO_NG.to_string(),
            label: PROPERTYPRO_NG_LABEL.to_string(),
            entry_urls: vec!["https://www.propertypro.ng/property-for-sale".to_string()],
            selectors: SourceSelectors {
                card: ".single-room-sale".to_string(),
                title: Some(".content-title".to_string()),
                price: Some(".content-title + .price".to_string()),
                rent: Some(".content-title + .price span".to_string()),
                units: Some(".description".to_string()),
                location: Some(".content-title + .price + .location".to_string()),
                building_type: None,
            },
            location_hints: vec![
                KnownLocation::Lagos,
                KnownLocation::Abuja,
                KnownLocation::Enugu,
                KnownLocation::Ibadan,
            ],
        },
        ScrapeSource {
            id: MEQASA_GH.to_string(),
            label: MEQASA_GH_LABEL.to_string(),
            entry_urls: vec!["https://meqasa.com/houses-for-sale-in-ghana".to_string()],
            selectors: SourceSelectors {
                card: ".property-list-card".to_string(),
                title: Some(".property-list-card-title".to_string()),
                price: Some(".price".to_string()),
                rent: None,
                units: None,
                location: Some(".details-location".to_string()),
                building_type: None,
            },
            location_hints: vec![KnownLocation::Ghana, KnownLocation::Accra],
        },
    ]
}

impl Config {
    /// Load `config.toml` (or the file named by `AFRISCAN_CONFIG`), falling back
    /// to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();
        let path = std::env::var("AFRISCAN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(ScraperError::Config("no scrape sources configured".into()));
        }
        for source in &self.sources {
            if source.selectors.card.trim().is_empty() {
                return Err(ScraperError::Config(format!(
                    "source '{}' has an empty card selector",
                    source.id
                )));
            }
        }
        if self.normalize.rent_baseline < 0 {
            return Err(ScraperError::Config("rent_baseline must not be negative".into()));
        }
        if self.normalize.default_unit_count == 0 {
            return Err(ScraperError::Config("default_unit_count must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_builtin_sources() {
        let config = Config::default();
        let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![PROPERTYPRO_NG, MEQASA_GH]);
        assert_eq!(config.normalize.rent_baseline, 1_000_000);
        assert_eq!(config.normalize.default_unit_count, 100);
        assert_eq!(config.scrape.snippet_limit, 6000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [normalize]
            default_unit_count = 40

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.normalize.default_unit_count, 40);
        assert_eq!(config.normalize.rent_baseline, 1_000_000);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn test_unknown_selector_keys_are_ignored() {
        let config = Config::from_toml_str(
            r#"
            [[sources]]
            id = "custom"
            label = "Custom"
            entry_urls = ["https://custom.example"]

            [sources.selectors]
            card = ".card"
            type = ".kind"
            description = ".blurb"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 1);
        let selectors = &config.sources[0].selectors;
        assert_eq!(selectors.card, ".card");
        assert_eq!(selectors.building_type.as_deref(), Some(".kind"));
        assert!(selectors.title.is_none());
    }

    #[test]
    fn test_sources_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [[sources]]
            id = "mubawab_ma"
            label = "Mubawab (Morocco)"
            entry_urls = ["https://www.mubawab.ma/en/sc/apartments-for-sale"]
            location_hints = ["Casablanca", "Marrakesh"]

            [sources.selectors]
            card = ".listingBox"
            price = ".priceTag"
            type = ".listingH3"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 1);
        let source = &config.sources[0];
        assert_eq!(source.selectors.building_type.as_deref(), Some(".listingH3"));
        assert_eq!(
            source.location_hints,
            vec![KnownLocation::Casablanca, KnownLocation::Marrakesh]
        );
    }

    #[test]
    fn test_rejects_empty_card_selector() {
        let result = Config::from_toml_str(
            r#"
            [[sources]]
            id = "broken"
            label = "Broken"
            entry_urls = []

            [sources.selectors]
            card = "  "
            "#,
        );
        assert!(matches!(result, Err(ScraperError::Config(_))));
    }
}
