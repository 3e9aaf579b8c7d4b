use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::app::ports::ListingStorePort;
use crate::error::{Result, ScraperError};
use crate::types::{NormalizedListing, RunSummary, StoredListing};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| ScraperError::Storage(format!("lock poisoned: {e}")))
}

#[derive(Default)]
struct MemoryState {
    listings: HashMap<String, StoredListing>,
    // First-seen order of hashes; upserts keep their slot.
    order: Vec<String>,
    runs: Vec<RunSummary>,
}

/// In-memory storage implementation for development/testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStorePort for InMemoryStorage {
    async fn upsert(&self, listing: &NormalizedListing, run_id: &str) -> Result<()> {
        let mut state = lock(&self.state)?;
        if !state.listings.contains_key(&listing.hash) {
            state.order.push(listing.hash.clone());
        }
        state.listings.insert(
            listing.hash.clone(),
            StoredListing {
                listing: listing.clone(),
                run_id: run_id.to_string(),
                updated_at: Utc::now(),
            },
        );
        debug!("Upserted listing {}", listing.hash);
        Ok(())
    }

    async fn record_run_summary(&self, summary: &RunSummary) -> Result<()> {
        let mut state = lock(&self.state)?;
        match state.runs.iter().position(|r| r.run_id == summary.run_id) {
            Some(idx) => state.runs[idx] = summary.clone(),
            None => state.runs.push(summary.clone()),
        }
        Ok(())
    }

    async fn list_listings(&self) -> Result<Vec<StoredListing>> {
        let state = lock(&self.state)?;
        Ok(state
            .order
            .iter()
            .filter_map(|hash| state.listings.get(hash).cloned())
            .collect())
    }

    async fn get_listing(&self, hash: &str) -> Result<Option<StoredListing>> {
        Ok(lock(&self.state)?.listings.get(hash).cloned())
    }

    async fn replace_listing(&self, stored: &StoredListing) -> Result<()> {
        let mut state = lock(&self.state)?;
        let hash = stored.listing.hash.clone();
        if !state.listings.contains_key(&hash) {
            return Err(ScraperError::NotFound(hash));
        }
        state.listings.insert(hash, stored.clone());
        Ok(())
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let state = lock(&self.state)?;
        let mut runs = state.runs.clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }
}

/// SQLite-backed store. Listings are keyed by hash; the listing body is
/// kept as JSON next to its run bookkeeping.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!("Opened listing store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                hash        TEXT PRIMARY KEY,
                source_id   TEXT NOT NULL,
                data        TEXT NOT NULL,
                run_id      TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS scrape_runs (
                run_id      TEXT PRIMARY KEY,
                status      TEXT NOT NULL,
                started_at  TEXT NOT NULL,
                data        TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn write_listing(
        conn: &Connection,
        listing: &NormalizedListing,
        run_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let data = serde_json::to_string(listing)?;
        conn.execute(
            r#"
            INSERT INTO listings (hash, source_id, data, run_id, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(hash) DO UPDATE SET
                source_id = excluded.source_id,
                data = excluded.data,
                run_id = excluded.run_id,
                updated_at = excluded.updated_at
            "#,
            params![
                listing.hash,
                listing.source_id,
                data,
                run_id,
                updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn row_to_stored(data: String, run_id: String, updated_at: String) -> Result<StoredListing> {
        let listing: NormalizedListing = serde_json::from_str(&data)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| ScraperError::Storage(format!("bad updated_at '{updated_at}': {e}")))?
            .with_timezone(&Utc);
        Ok(StoredListing {
            listing,
            run_id,
            updated_at,
        })
    }
}

#[async_trait]
impl ListingStorePort for SqliteStorage {
    async fn upsert(&self, listing: &NormalizedListing, run_id: &str) -> Result<()> {
        let conn = lock(&self.conn)?;
        Self::write_listing(&conn, listing, run_id, Utc::now())?;
        debug!("Upserted listing {}", listing.hash);
        Ok(())
    }

    async fn record_run_summary(&self, summary: &RunSummary) -> Result<()> {
        let data = serde_json::to_string(summary)?;
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO scrape_runs (run_id, status, started_at, data)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(run_id) DO UPDATE SET
                status = excluded.status,
                data = excluded.data
            "#,
            params![
                summary.run_id,
                summary.status.as_str(),
                summary.started_at.to_rfc3339(),
                data
            ],
        )?;
        Ok(())
    }

    async fn list_listings(&self) -> Result<Vec<StoredListing>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT data, run_id, updated_at FROM listings ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<(String, String, String)>, _>>()?;
        rows.into_iter()
            .map(|(data, run_id, updated_at)| Self::row_to_stored(data, run_id, updated_at))
            .collect()
    }

    async fn get_listing(&self, hash: &str) -> Result<Option<StoredListing>> {
        let conn = lock(&self.conn)?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT data, run_id, updated_at FROM listings WHERE hash = ?1",
                params![hash],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(|(data, run_id, updated_at)| Self::row_to_stored(data, run_id, updated_at))
            .transpose()
    }

    async fn replace_listing(&self, stored: &StoredListing) -> Result<()> {
        let conn = lock(&self.conn)?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM listings WHERE hash = ?1",
                params![stored.listing.hash],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(ScraperError::NotFound(stored.listing.hash.clone()));
        }
        Self::write_listing(&conn, &stored.listing, &stored.run_id, stored.updated_at)
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT data FROM scrape_runs ORDER BY started_at DESC")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(ScraperError::from))
            .collect()
    }
}
