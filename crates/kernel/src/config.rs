//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Path to the hostname → tenant map (default: ./tenants.toml).
    pub tenants_file: PathBuf,

    /// Optional JSON fixture used to seed the in-memory store.
    pub seed_file: Option<PathBuf>,

    /// Cache TTL in seconds (default: 300).
    pub cache_ttl_secs: u64,

    /// Shared secret for admin write endpoints. When None, admin routes are
    /// disabled.
    pub admin_token: Option<String>,

    /// Media host cloud name for signed uploads. When None, signed uploads
    /// are disabled.
    pub media_cloud_name: Option<String>,

    /// Media host API key.
    pub media_api_key: Option<String>,

    /// Media host API secret.
    pub media_api_secret: Option<String>,

    /// SMTP host for email delivery. When None, email is disabled.
    pub smtp_host: Option<String>,

    /// SMTP port (default: 587).
    pub smtp_port: u16,

    /// SMTP username for authentication.
    pub smtp_username: Option<String>,

    /// SMTP password for authentication.
    pub smtp_password: Option<String>,

    /// SMTP encryption mode: "starttls" (default), "tls", or "none".
    pub smtp_encryption: String,

    /// From address for outgoing email.
    pub smtp_from_email: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let tenants_file = env::var("TENANTS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./tenants.toml"));

        let seed_file = env::var("SEED_FILE").map(PathBuf::from).ok();

        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .context("CACHE_TTL_SECS must be a valid u64")?;

        let admin_token = env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());

        let media_cloud_name = env::var("MEDIA_CLOUD_NAME").ok();
        let media_api_key = env::var("MEDIA_API_KEY").ok();
        let media_api_secret = env::var("MEDIA_API_SECRET").ok();

        let smtp_host = env::var("SMTP_HOST").ok();

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .context("SMTP_PORT must be a valid u16")?;

        let smtp_username = env::var("SMTP_USERNAME").ok();
        let smtp_password = env::var("SMTP_PASSWORD").ok();

        let smtp_encryption = env::var("SMTP_ENCRYPTION")
            .unwrap_or_else(|_| "starttls".to_string())
            .to_lowercase();

        let smtp_from_email =
            env::var("SMTP_FROM_EMAIL").unwrap_or_else(|_| "noreply@localhost".to_string());

        Ok(Self {
            port,
            tenants_file,
            seed_file,
            cache_ttl_secs,
            admin_token,
            media_cloud_name,
            media_api_key,
            media_api_secret,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            smtp_encryption,
            smtp_from_email,
        })
    }
}

impl Default for Config {
    /// Defaults suitable for tests: no admin token, no media credentials,
    /// no SMTP.
    fn default() -> Self {
        Self {
            port: 3000,
            tenants_file: PathBuf::from("./tenants.toml"),
            seed_file: None,
            cache_ttl_secs: 300,
            admin_token: None,
            media_cloud_name: None,
            media_api_key: None,
            media_api_secret: None,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_encryption: "starttls".to_string(),
            smtp_from_email: "noreply@localhost".to_string(),
        }
    }
}
