//! Per-tenant public settings document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single social network link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

/// Public branding and contact settings for one tenant.
///
/// One document per tenant, stored at `clients/{tenant}/settings/public`.
/// Created on provisioning, mutated only through admin writes, read-mostly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Where lead notifications are sent, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social: Vec<SocialLink>,

    /// Per-tenant feature flags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
}

impl PublicSettings {
    /// Whether a named feature flag is enabled for this tenant.
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}
