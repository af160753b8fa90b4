//! Page and block documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Publication status of a page.
///
/// Only published pages are ever surfaced to anonymous readers; the gate is
/// enforced on the read side by the data cache, not by deleting drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft,
    Published,
}

impl Default for PageStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// Page metadata for the document head.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
}

/// Navigation placement for a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavPlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub order: i32,

    #[serde(default)]
    pub show_in_nav: bool,
}

/// One typed content block inside a page.
///
/// `block_type` must name an entry in the block registry; `props` must
/// satisfy that entry's field schema. Validation happens at render time so a
/// bad block degrades to an inline error fragment instead of a missing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: String,

    #[serde(default)]
    pub props: Value,
}

/// A page document, identified by `(tenant, slug)`.
///
/// Versioning is last-write-wins; there is no optimistic concurrency on page
/// documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Slug doubles as the document id and is filled in after loading.
    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub status: PageStatus,

    #[serde(default)]
    pub meta: PageMeta,

    #[serde(default)]
    pub nav: NavPlacement,

    /// Ordered block list. Stored documents written by the original admin
    /// builder call this array `sections`.
    #[serde(default, alias = "sections")]
    pub blocks: Vec<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    /// Whether anonymous readers may see this page.
    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_minimal_page_defaults_to_draft() {
        let page: Page = serde_json::from_value(json!({})).unwrap();
        assert_eq!(page.status, PageStatus::Draft);
        assert!(!page.is_published());
        assert!(page.blocks.is_empty());
    }

    #[test]
    fn deserialize_published_page_with_blocks() {
        let page: Page = serde_json::from_value(json!({
            "status": "published",
            "meta": { "title": "Inicio", "description": "Bienvenido" },
            "nav": { "label": "Inicio", "order": 1, "showInNav": true },
            "blocks": [
                { "id": "b1", "type": "hero", "props": { "title": "Hola" } }
            ]
        }))
        .unwrap();

        assert!(page.is_published());
        assert_eq!(page.meta.title.as_deref(), Some("Inicio"));
        assert!(page.nav.show_in_nav);
        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.blocks[0].block_type, "hero");
    }

    #[test]
    fn sections_alias_is_accepted() {
        let page: Page = serde_json::from_value(json!({
            "status": "published",
            "sections": [ { "id": "b1", "type": "banner", "props": {} } ]
        }))
        .unwrap();
        assert_eq!(page.blocks.len(), 1);
    }
}
