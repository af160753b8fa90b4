//! Tenant-scoped content listings (vehicles, products, services, ...).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction for listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Short token used in cache-key signatures.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A single-field sort specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: "createdAt".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Query options for fetching listings.
///
/// Filters are equality-only; listings are never joined across tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,

    #[serde(default)]
    pub sort: SortSpec,

    #[serde(default = "default_limit", alias = "limitTo")]
    pub limit: usize,
}

fn default_limit() -> usize {
    12
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            sort: SortSpec::default(),
            limit: default_limit(),
        }
    }
}

/// Reference to an uploaded media asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A tenant-scoped content record, stored under
/// `clients/{tenant}/content/listings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Document id, filled in after loading.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,

    /// Free-form attributes (brand, year, km, ...) the admin builder defines
    /// per category.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Best image to show on a card: the main image, else the first media
    /// entry.
    pub fn card_image(&self) -> Option<&str> {
        self.main_image
            .as_deref()
            .or_else(|| self.media.first().map(|m| m.url.as_str()))
    }
}
