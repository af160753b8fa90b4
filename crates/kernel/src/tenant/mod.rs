//! Tenant resolution.
//!
//! Maps an incoming hostname (or an explicit override) to a tenant id using
//! a static configuration map loaded once at startup. Resolutions are
//! memoized per hostname for the process lifetime; concurrent first
//! resolutions for the same hostname share a single in-flight lookup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::models::TenantId;

/// Static hostname → tenant configuration, loaded once at startup.
///
/// File format (TOML):
///
/// ```toml
/// # Single-site mode: used when no hostname matches.
/// default = "autoelite"
///
/// [hosts]
/// "autoelite.com.ar" = "autoelite"
/// "www.autoelite.com.ar" = "autoelite"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantMap {
    #[serde(default)]
    hosts: HashMap<String, TenantId>,

    /// Optional single-site default, used when no hostname matches.
    #[serde(default)]
    default: Option<TenantId>,
}

impl TenantMap {
    /// Parse a tenant map from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid tenant map TOML")
    }

    /// Load a tenant map from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tenant map {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Build a map from explicit entries (used by tests).
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, TenantId)>,
        default: Option<TenantId>,
    ) -> Self {
        Self {
            hosts: entries.into_iter().collect(),
            default,
        }
    }

    /// Look up a normalized hostname.
    fn lookup(&self, host: &str) -> Option<TenantId> {
        self.hosts
            .get(host)
            .or_else(|| self.hosts.get(host.strip_prefix("www.")?))
            .cloned()
            .or_else(|| self.default.clone())
    }
}

/// Resolves hostnames to tenant ids with per-hostname memoization.
#[derive(Clone)]
pub struct TenantResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    map: TenantMap,

    /// Memoized resolutions. The `OnceCell` collapses concurrent first
    /// resolutions for a hostname into one in-flight lookup.
    resolved: DashMap<String, Arc<OnceCell<Option<TenantId>>>>,
}

impl TenantResolver {
    /// Create a resolver over a loaded tenant map.
    pub fn new(map: TenantMap) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                map,
                resolved: DashMap::new(),
            }),
        }
    }

    /// Resolve a tenant id.
    ///
    /// Resolution order: an explicit override (a test/query hint) wins, then
    /// the static hostname map, then the configured single-site default.
    /// Absence of all three yields `None`; callers must treat that as
    /// "render the unconfigured-site placeholder", never as an error.
    pub async fn resolve(&self, hostname: &str, override_id: Option<&str>) -> Option<TenantId> {
        if let Some(id) = override_id.filter(|id| !id.is_empty()) {
            debug!(tenant = %id, "tenant resolved from override");
            return Some(TenantId::new(id));
        }

        let host = normalize_host(hostname);
        if host.is_empty() {
            warn!("tenant resolution called with empty hostname");
            return None;
        }

        let cell = self
            .inner
            .resolved
            .entry(host.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_init(|| async {
            let resolved = self.inner.map.lookup(&host);
            match &resolved {
                Some(id) => debug!(host = %host, tenant = %id, "tenant resolved"),
                None => warn!(host = %host, "no tenant mapping for hostname"),
            }
            resolved
        })
        .await
        .clone()
    }

    /// Drop the memoized resolution for a hostname, forcing a fresh lookup
    /// on next access.
    pub fn forget(&self, hostname: &str) {
        self.inner.resolved.remove(&normalize_host(hostname));
    }
}

/// Lowercase the hostname and strip any port suffix.
fn normalize_host(hostname: &str) -> String {
    let host = hostname.split(':').next().unwrap_or(hostname);
    host.trim().to_ascii_lowercase()
}
