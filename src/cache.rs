//! Read-through cache for the public catalog.
//!
//! Holds the anonymous view of products and published curriculum modules. A fresh
//! entry is served from memory; an expired one is refetched. When the database
//! cannot be reached the last good entry is served as stale, and if there never was
//! one the static snapshot configured under `[catalog]` is used instead.

use crate::{
    core::{
        Requester,
        curriculum::{self, ModuleFilter},
        product,
    },
    entities::{CurriculumModuleModel, ProductModel},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Public catalog contents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Products, featured first
    pub products: Vec<ProductModel>,
    /// Published modules in curriculum order
    pub modules: Vec<CurriculumModuleModel>,
}

impl CatalogSnapshot {
    /// Reads the catalog as an anonymous visitor sees it.
    ///
    /// # Errors
    /// Returns an error if either catalog query fails.
    pub async fn fetch(db: &DatabaseConnection) -> Result<Self> {
        let products = product::list_products(db, &Requester::Anonymous).await?;
        let modules =
            curriculum::list_modules(db, &Requester::Anonymous, &ModuleFilter::default()).await?;
        Ok(Self { products, modules })
    }

    /// Loads a snapshot previously written as JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Where a [`CatalogView`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Just read from the database
    Live,
    /// In-memory entry younger than the TTL
    Cached,
    /// Expired entry served because the database failed
    Stale,
    /// Configured static snapshot, no live read has succeeded yet
    Static,
}

/// A catalog snapshot and its provenance.
#[derive(Clone, Debug)]
pub struct CatalogView {
    /// Catalog contents
    pub snapshot: Arc<CatalogSnapshot>,
    /// Provenance
    pub source: CatalogSource,
}

struct Entry {
    snapshot: Arc<CatalogSnapshot>,
    fetched_at: Instant,
}

/// TTL cache over [`CatalogSnapshot::fetch`].
pub struct CatalogCache {
    ttl: Duration,
    entry: RwLock<Option<Entry>>,
    fallback: Option<Arc<CatalogSnapshot>>,
}

impl CatalogCache {
    /// Creates an empty cache without a static fallback.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
            fallback: None,
        }
    }

    /// Sets the snapshot served when no live read has ever succeeded.
    #[must_use]
    pub fn with_fallback(mut self, snapshot: CatalogSnapshot) -> Self {
        self.fallback = Some(Arc::new(snapshot));
        self
    }

    /// Returns the catalog, refetching when the cached entry has expired.
    ///
    /// # Errors
    /// Returns the database error only when there is neither a previous entry nor a
    /// static fallback to serve.
    pub async fn get(&self, db: &DatabaseConnection) -> Result<CatalogView> {
        {
            let guard = self.entry.read().await;
            if let Some(entry) = guard.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!("Serving cached catalog");
                    return Ok(CatalogView {
                        snapshot: Arc::clone(&entry.snapshot),
                        source: CatalogSource::Cached,
                    });
                }
            }
        }

        match CatalogSnapshot::fetch(db).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let mut guard = self.entry.write().await;
                *guard = Some(Entry {
                    snapshot: Arc::clone(&snapshot),
                    fetched_at: Instant::now(),
                });
                info!(
                    "Catalog refreshed with {} products and {} modules.",
                    snapshot.products.len(),
                    snapshot.modules.len()
                );
                Ok(CatalogView {
                    snapshot,
                    source: CatalogSource::Live,
                })
            }
            Err(e) => {
                if let Some(entry) = self.entry.read().await.as_ref() {
                    warn!("Catalog refresh failed, serving stale entry: {}", e);
                    return Ok(CatalogView {
                        snapshot: Arc::clone(&entry.snapshot),
                        source: CatalogSource::Stale,
                    });
                }
                if let Some(fallback) = &self.fallback {
                    warn!("Catalog unavailable, serving static snapshot: {}", e);
                    return Ok(CatalogView {
                        snapshot: Arc::clone(fallback),
                        source: CatalogSource::Static,
                    });
                }
                Err(e)
            }
        }
    }

    /// Drops the cached entry so the next read goes to the database.
    pub async fn invalidate(&self) {
        self.entry.write().await.take();
        debug!("Catalog cache invalidated");
    }
}
