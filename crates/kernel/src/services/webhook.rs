//! Webhook dispatch.
//!
//! Tenants register webhooks as documents under `clients/{tenant}/webhooks`.
//! When a lifecycle event fires, every active webhook subscribed to that
//! event receives a POST with the event payload. Dispatch is fire-and-forget:
//! failures are logged and never retried here; retry policy, if any, lives
//! in the receiving collaborator.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::events::Event;
use crate::models::TenantId;
use crate::store::{CollectionQuery, DocumentStore};

/// Request timeout for webhook deliveries.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A tenant's registered webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: String,

    /// Event kind this webhook subscribes to (e.g. `form.submitted`).
    pub event_type: String,

    #[serde(default)]
    pub active: bool,
}

/// Dispatches lifecycle events to tenant-registered webhook URLs.
#[derive(Clone)]
pub struct WebhookService {
    inner: Arc<WebhookInner>,
}

struct WebhookInner {
    store: Arc<dyn DocumentStore>,
    client: reqwest::Client,
}

impl WebhookService {
    /// Create a webhook service over the document store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            // No redirect following: a 302 must not re-route a delivery.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(WebhookInner { store, client }),
        }
    }

    /// Deliver an event to every matching active webhook of its tenant.
    ///
    /// Returns the number of successful deliveries. Failures are logged and
    /// swallowed.
    pub async fn dispatch(&self, event: &Event) -> u64 {
        let webhooks = self.load_webhooks(&event.tenant, &event.kind).await;
        if webhooks.is_empty() {
            debug!(tenant = %event.tenant, kind = %event.kind, "no webhooks registered");
            return 0;
        }

        let body = json!({
            "event": event.kind,
            "timestamp": event.timestamp.to_rfc3339(),
            "data": event.payload,
        });

        let mut delivered = 0u64;
        for webhook in &webhooks {
            match self.inner.client.post(&webhook.url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %webhook.url, kind = %event.kind, "webhook delivered");
                    delivered += 1;
                }
                Ok(response) => {
                    warn!(
                        url = %webhook.url,
                        status = %response.status(),
                        kind = %event.kind,
                        "webhook rejected"
                    );
                }
                Err(error) => {
                    warn!(url = %webhook.url, error = %error, kind = %event.kind, "webhook failed");
                }
            }
        }

        delivered
    }

    /// Load the tenant's active webhooks subscribed to an event kind.
    async fn load_webhooks(&self, tenant: &TenantId, kind: &str) -> Vec<WebhookConfig> {
        let collection = format!("clients/{tenant}/webhooks");
        let query = CollectionQuery::default().filter("active", serde_json::Value::Bool(true));

        let docs = match self.inner.store.query_collection(&collection, &query).await {
            Ok(docs) => docs,
            Err(error) => {
                warn!(tenant = %tenant, error = %error, "failed to load webhooks");
                return Vec::new();
            }
        };

        docs.into_iter()
            .filter_map(|doc| serde_json::from_value::<WebhookConfig>(doc.data).ok())
            .filter(|webhook| webhook.event_type == kind)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::events;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn dispatch_without_webhooks_is_zero() {
        let service = WebhookService::new(Arc::new(MemoryStore::new()));
        let event = Event::new(
            events::FORM_SUBMITTED,
            TenantId::new("acme"),
            json!({ "leadId": "x" }),
        );
        assert_eq!(service.dispatch(&event).await, 0);
    }

    #[tokio::test]
    async fn load_webhooks_filters_inactive_and_other_events() {
        let store = MemoryStore::new();
        store
            .set_document(
                "clients/acme/webhooks",
                "w1",
                json!({ "url": "https://hooks.example.com/a", "eventType": "form.submitted", "active": true }),
                false,
            )
            .await
            .unwrap();
        store
            .set_document(
                "clients/acme/webhooks",
                "w2",
                json!({ "url": "https://hooks.example.com/b", "eventType": "form.submitted", "active": false }),
                false,
            )
            .await
            .unwrap();
        store
            .set_document(
                "clients/acme/webhooks",
                "w3",
                json!({ "url": "https://hooks.example.com/c", "eventType": "page.published", "active": true }),
                false,
            )
            .await
            .unwrap();

        let service = WebhookService::new(Arc::new(store));
        let webhooks = service
            .load_webhooks(&TenantId::new("acme"), events::FORM_SUBMITTED)
            .await;

        assert_eq!(webhooks.len(), 1);
        assert_eq!(webhooks[0].url, "https://hooks.example.com/a");
    }

    #[tokio::test]
    async fn webhooks_are_tenant_scoped() {
        let store = MemoryStore::new();
        store
            .set_document(
                "clients/otro/webhooks",
                "w1",
                json!({ "url": "https://hooks.example.com/x", "eventType": "form.submitted", "active": true }),
                false,
            )
            .await
            .unwrap();

        let service = WebhookService::new(Arc::new(store));
        let webhooks = service
            .load_webhooks(&TenantId::new("acme"), events::FORM_SUBMITTED)
            .await;
        assert!(webhooks.is_empty());
    }
}
