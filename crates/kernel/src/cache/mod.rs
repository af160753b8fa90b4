//! Tenant-scoped data cache.
//!
//! Time-boxed cache sitting in front of the document store for tenant
//! settings, pages, and listings. Three typed Moka caches share one fixed
//! TTL; loads are single-flight (`try_get_with`), so a cache stampede for
//! one key collapses into one underlying fetch. Fetch failures are returned
//! as absent/empty and are never cached, so the next call retries
//! immediately instead of being poisoned for the TTL window.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Listing, ListingQuery, Page, PublicSettings, TenantId};
use crate::store::{CollectionQuery, DocumentStore};

/// Default cache TTL: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Maximum entries per cache.
const MAX_CAPACITY: u64 = 10_000;

#[derive(Clone, Hash, PartialEq, Eq)]
struct SettingsKey {
    tenant: TenantId,
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct PageKey {
    tenant: TenantId,
    slug: String,
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct ListingsKey {
    tenant: TenantId,
    signature: String,
}

/// Tenant-scoped, time-boxed cache over the document store.
///
/// Owns invalidation: after any admin write, [`TenantDataCache::invalidate`]
/// purges every entry namespaced to the tenant so readers see fresh data on
/// next access rather than waiting out the TTL.
#[derive(Clone)]
pub struct TenantDataCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: Arc<dyn DocumentStore>,
    settings: Cache<SettingsKey, Option<Arc<PublicSettings>>>,
    pages: Cache<PageKey, Option<Arc<Page>>>,
    listings: Cache<ListingsKey, Arc<Vec<Listing>>>,
}

impl TenantDataCache {
    /// Create a cache over the given store with the given TTL.
    pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                settings: build_cache(ttl),
                pages: build_cache(ttl),
                listings: build_cache(ttl),
            }),
        }
    }

    /// Fetch a tenant's public settings, from cache when fresh.
    pub async fn get_settings(&self, tenant: &TenantId) -> Option<Arc<PublicSettings>> {
        let key = SettingsKey {
            tenant: tenant.clone(),
        };
        let result = self
            .inner
            .settings
            .try_get_with(key, fetch_settings(Arc::clone(&self.inner.store), tenant.clone()))
            .await;

        match result {
            Ok(settings) => settings,
            Err(error) => {
                warn!(tenant = %tenant, error = %error, "settings fetch failed");
                None
            }
        }
    }

    /// Fetch a page by slug, from cache when fresh.
    ///
    /// Enforces the publish invariant: a stored page whose status is not
    /// `published` is absent to this accessor, even though it exists in
    /// storage.
    pub async fn get_page(&self, tenant: &TenantId, slug: &str) -> Option<Arc<Page>> {
        let key = PageKey {
            tenant: tenant.clone(),
            slug: slug.to_string(),
        };
        let result = self
            .inner
            .pages
            .try_get_with(
                key,
                fetch_page(Arc::clone(&self.inner.store), tenant.clone(), slug.to_string()),
            )
            .await;

        match result {
            Ok(page) => page,
            Err(error) => {
                warn!(tenant = %tenant, slug = %slug, error = %error, "page fetch failed");
                None
            }
        }
    }

    /// Fetch listings matching a query, from cache when fresh.
    ///
    /// The cache key derives from the canonical serialization of
    /// `(filters, sort, limit)`, so distinct filter combinations are cached
    /// independently. An implicit `status == published` filter is always
    /// applied in addition to caller-supplied filters. Returns an empty list
    /// on fetch failure, without caching the failure.
    pub async fn get_listings(&self, tenant: &TenantId, query: &ListingQuery) -> Arc<Vec<Listing>> {
        let key = ListingsKey {
            tenant: tenant.clone(),
            signature: listings_signature(query),
        };
        let result = self
            .inner
            .listings
            .try_get_with(
                key,
                fetch_listings(Arc::clone(&self.inner.store), tenant.clone(), query.clone()),
            )
            .await;

        match result {
            Ok(listings) => listings,
            Err(error) => {
                warn!(tenant = %tenant, error = %error, "listings fetch failed");
                Arc::new(Vec::new())
            }
        }
    }

    /// Purge every cache entry namespaced to the tenant.
    pub fn invalidate(&self, tenant: &TenantId) {
        let t = tenant.clone();
        if let Err(error) = self.inner.settings.invalidate_entries_if(move |k, _| k.tenant == t) {
            warn!(error = %error, "settings invalidation predicate rejected");
        }
        let t = tenant.clone();
        if let Err(error) = self.inner.pages.invalidate_entries_if(move |k, _| k.tenant == t) {
            warn!(error = %error, "pages invalidation predicate rejected");
        }
        let t = tenant.clone();
        if let Err(error) = self.inner.listings.invalidate_entries_if(move |k, _| k.tenant == t) {
            warn!(error = %error, "listings invalidation predicate rejected");
        }
        debug!(tenant = %tenant, "tenant cache invalidated");
    }
}

fn build_cache<K, V>(ttl: Duration) -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(MAX_CAPACITY)
        .time_to_live(ttl)
        .support_invalidation_closures()
        .build()
}

/// Canonical cache-key signature for a listings query.
///
/// Filters are emitted in key order; the sort and limit are appended so
/// distinct combinations never collide.
pub fn listings_signature(query: &ListingQuery) -> String {
    let filters: Vec<String> = query
        .filters
        .iter()
        .map(|(field, value)| format!("{field}={}", canonical_value(value)))
        .collect();
    format!(
        "{}|sort={}:{}|limit={}",
        filters.join("|"),
        query.sort.field,
        query.sort.direction.as_str(),
        query.limit
    )
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn fetch_settings(
    store: Arc<dyn DocumentStore>,
    tenant: TenantId,
) -> Result<Option<Arc<PublicSettings>>> {
    let collection = format!("clients/{tenant}/settings");
    let Some(doc) = store
        .get_document(&collection, "public")
        .await
        .context("settings fetch")?
    else {
        debug!(tenant = %tenant, "settings not found");
        return Ok(None);
    };

    match serde_json::from_value::<PublicSettings>(doc) {
        Ok(settings) => Ok(Some(Arc::new(settings))),
        Err(error) => {
            warn!(tenant = %tenant, error = %error, "malformed settings document");
            Ok(None)
        }
    }
}

async fn fetch_page(
    store: Arc<dyn DocumentStore>,
    tenant: TenantId,
    slug: String,
) -> Result<Option<Arc<Page>>> {
    let collection = format!("clients/{tenant}/pages");
    let Some(doc) = store
        .get_document(&collection, &slug)
        .await
        .context("page fetch")?
    else {
        debug!(tenant = %tenant, slug = %slug, "page not found");
        return Ok(None);
    };

    let mut page = match serde_json::from_value::<Page>(doc) {
        Ok(page) => page,
        Err(error) => {
            warn!(tenant = %tenant, slug = %slug, error = %error, "malformed page document");
            return Ok(None);
        }
    };
    page.slug = slug.clone();

    if !page.is_published() {
        debug!(tenant = %tenant, slug = %slug, "page not published");
        return Ok(None);
    }

    Ok(Some(Arc::new(page)))
}

async fn fetch_listings(
    store: Arc<dyn DocumentStore>,
    tenant: TenantId,
    query: ListingQuery,
) -> Result<Arc<Vec<Listing>>> {
    let collection = format!("clients/{tenant}/content/listings");

    let mut store_query = CollectionQuery::default()
        .filter("status", Value::String("published".to_string()))
        .order(query.sort.field.clone(), query.sort.direction)
        .limit(query.limit);
    for (field, value) in &query.filters {
        store_query = store_query.filter(field.clone(), value.clone());
    }

    let docs = store
        .query_collection(&collection, &store_query)
        .await
        .context("listings fetch")?;

    let listings: Vec<Listing> = docs
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<Listing>(doc.data) {
            Ok(mut listing) => {
                listing.id = doc.id;
                Some(listing)
            }
            Err(error) => {
                warn!(tenant = %tenant, id = %doc.id, error = %error, "malformed listing skipped");
                None
            }
        })
        .collect();

    debug!(tenant = %tenant, count = listings.len(), "listings loaded");
    Ok(Arc::new(listings))
}
