//! Signed-upload issuance.
//!
//! Produces short-lived signed upload tickets scoped to a tenant's media
//! folder. The client uploads directly to the media host using the returned
//! endpoint and credential fields; the signature is computed server-side so
//! the API secret never leaves the process.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::models::TenantId;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued ticket stays valid.
const TICKET_LIFETIME_MINUTES: i64 = 10;

/// A short-lived signed upload ticket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    /// Where the client POSTs the upload.
    pub upload_endpoint: String,

    /// Form fields the client must include verbatim.
    pub credential_fields: BTreeMap<String, String>,

    pub expires_at: DateTime<Utc>,
}

/// Issues signed upload tickets using the media host's server-side secret.
#[derive(Clone)]
pub struct SignedUploadService {
    inner: Arc<UploadInner>,
}

struct UploadInner {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl SignedUploadService {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            inner: Arc::new(UploadInner {
                cloud_name,
                api_key,
                api_secret,
            }),
        }
    }

    /// Issue a ticket scoped to `clients/{tenant}/{folder}`.
    pub fn issue(&self, tenant: &TenantId, folder: &str) -> SignedUpload {
        self.issue_at(tenant, folder, Utc::now())
    }

    fn issue_at(&self, tenant: &TenantId, folder: &str, now: DateTime<Utc>) -> SignedUpload {
        let scoped_folder = format!("clients/{tenant}/{folder}");
        let timestamp = now.timestamp().to_string();

        // Parameters are signed in sorted key order, joined with '&'.
        let params = BTreeMap::from([
            ("folder".to_string(), scoped_folder.clone()),
            ("timestamp".to_string(), timestamp.clone()),
        ]);
        let to_sign: String = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let signature = self.sign(&to_sign);

        let mut credential_fields = params;
        credential_fields.insert("apiKey".to_string(), self.inner.api_key.clone());
        credential_fields.insert("signature".to_string(), signature);

        SignedUpload {
            upload_endpoint: format!(
                "https://api.cloudinary.com/v1_1/{}/auto/upload",
                self.inner.cloud_name
            ),
            credential_fields,
            expires_at: now + Duration::minutes(TICKET_LIFETIME_MINUTES),
        }
    }

    fn sign(&self, payload: &str) -> String {
        // HMAC accepts keys of any length; new_from_slice cannot fail.
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(self.inner.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
