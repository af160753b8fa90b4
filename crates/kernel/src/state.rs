//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cache::TenantDataCache;
use crate::config::Config;
use crate::content::{BlockRegistry, PageAssembler};
use crate::events::{Event, EventBus, FORM_SUBMITTED, LISTING_UPDATED, PAGE_PUBLISHED};
use crate::models::TenantId;
use crate::services::email::EmailService;
use crate::services::upload::SignedUploadService;
use crate::services::webhook::WebhookService;
use crate::store::{DocumentStore, MemoryStore};
use crate::tenant::{TenantMap, TenantResolver};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Loaded configuration.
    config: Config,

    /// Document store (abstract; the bundled implementation is in-memory).
    store: Arc<dyn DocumentStore>,

    /// Tenant-scoped data cache.
    cache: TenantDataCache,

    /// Hostname → tenant resolution.
    resolver: TenantResolver,

    /// Block type registry.
    registry: Arc<BlockRegistry>,

    /// Page assembler.
    assembler: PageAssembler,

    /// Lifecycle event bus, drained to notification collaborators.
    events: Arc<EventBus>,

    /// Webhook dispatch service.
    webhooks: WebhookService,

    /// Email delivery (available when SMTP is configured).
    email: Option<Arc<EmailService>>,

    /// Signed-upload issuance (available when media credentials are
    /// configured).
    uploads: Option<SignedUploadService>,
}

impl AppState {
    /// Initialize state from configuration: load the tenant map, build the
    /// store (seeded when a fixture is configured), and wire services.
    pub async fn new(config: &Config) -> Result<Self> {
        let tenant_map = TenantMap::load(&config.tenants_file)
            .with_context(|| format!("loading tenant map {}", config.tenants_file.display()))?;

        let store: Arc<dyn DocumentStore> = match &config.seed_file {
            Some(path) => Arc::new(MemoryStore::from_seed_file(path)?),
            None => Arc::new(MemoryStore::new()),
        };

        Ok(Self::build(config.clone(), tenant_map, store))
    }

    /// Build state over an explicit store and tenant map (used by tests).
    pub fn with_store(config: Config, tenant_map: TenantMap, store: Arc<dyn DocumentStore>) -> Self {
        Self::build(config, tenant_map, store)
    }

    fn build(config: Config, tenant_map: TenantMap, store: Arc<dyn DocumentStore>) -> Self {
        let cache = TenantDataCache::new(
            Arc::clone(&store),
            std::time::Duration::from_secs(config.cache_ttl_secs),
        );
        let resolver = TenantResolver::new(tenant_map);
        let registry = Arc::new(BlockRegistry::with_standard_types());
        let assembler = PageAssembler::new(Arc::clone(&registry), cache.clone());
        let events = Arc::new(EventBus::new());
        let webhooks = WebhookService::new(Arc::clone(&store));

        let email = match &config.smtp_host {
            Some(host) => match EmailService::new(
                host,
                config.smtp_port,
                config.smtp_username.as_deref(),
                config.smtp_password.as_deref(),
                &config.smtp_encryption,
                config.smtp_from_email.clone(),
            ) {
                Ok(service) => Some(Arc::new(service)),
                Err(error) => {
                    warn!(error = %error, "email disabled: SMTP transport failed to build");
                    None
                }
            },
            None => None,
        };

        let uploads = match (
            &config.media_cloud_name,
            &config.media_api_key,
            &config.media_api_secret,
        ) {
            (Some(cloud), Some(key), Some(secret)) => Some(SignedUploadService::new(
                cloud.clone(),
                key.clone(),
                secret.clone(),
            )),
            _ => None,
        };

        register_notification_handlers(&events, &webhooks, &cache, email.clone());

        info!(
            blocks = registry.len(),
            email = email.is_some(),
            uploads = uploads.is_some(),
            "application state initialized"
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                cache,
                resolver,
                registry,
                assembler,
                events,
                webhooks,
                email,
                uploads,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    pub fn cache(&self) -> &TenantDataCache {
        &self.inner.cache
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.inner.resolver
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.inner.registry
    }

    pub fn assembler(&self) -> &PageAssembler {
        &self.inner.assembler
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn webhooks(&self) -> &WebhookService {
        &self.inner.webhooks
    }

    pub fn uploads(&self) -> Option<&SignedUploadService> {
        self.inner.uploads.as_ref()
    }

    /// Build and emit a lifecycle event.
    pub fn emit_event(&self, kind: &str, tenant: &TenantId, payload: serde_json::Value) {
        let event = Event::new(kind, tenant.clone(), payload);
        self.inner.events.emit(&event);
    }
}

/// Wire the event bus to the notification collaborators.
///
/// Webhook dispatch and email are spawned fire-and-forget so emitters never
/// block on network I/O; delivery failures are logged by the services.
fn register_notification_handlers(
    events: &EventBus,
    webhooks: &WebhookService,
    cache: &TenantDataCache,
    email: Option<Arc<EmailService>>,
) {
    for kind in [PAGE_PUBLISHED, FORM_SUBMITTED, LISTING_UPDATED] {
        let webhooks = webhooks.clone();
        events.on(kind, move |event| {
            let webhooks = webhooks.clone();
            let event = event.clone();
            tokio::spawn(async move {
                webhooks.dispatch(&event).await;
            });
            Ok(())
        });
    }

    if let Some(email) = email {
        let cache = cache.clone();
        events.on(FORM_SUBMITTED, move |event| {
            let email = Arc::clone(&email);
            let cache = cache.clone();
            let event = event.clone();
            tokio::spawn(async move {
                let Some(settings) = cache.get_settings(&event.tenant).await else {
                    return;
                };
                let Some(to) = settings.notify_email.clone() else {
                    return;
                };
                if let Err(error) = email
                    .send_lead_notification(&to, &settings.name, &event.payload)
                    .await
                {
                    warn!(tenant = %event.tenant, error = %error, "lead notification failed");
                }
            });
            Ok(())
        });
    }
}
