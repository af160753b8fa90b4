//! Lead documents captured from contact-form submissions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A contact-form submission, stored under `clients/{tenant}/leads`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Document id, filled in after loading.
    #[serde(default)]
    pub id: String,

    /// Slug of the page the form lived on.
    pub page_slug: String,

    /// Id of the contact-form block that produced this lead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    /// The submitted field values, already validated and sanitized.
    pub data: BTreeMap<String, Value>,

    pub submitted_at: DateTime<Utc>,
}
