//! In-process event bus.
//!
//! Lifecycle events (page published, form submitted, listing updated) are
//! emitted here and drained to notification collaborators (webhooks, email)
//! registered as handlers. Handlers run synchronously in registration order;
//! a handler failure is logged and never propagated to the emitter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error};

use crate::models::TenantId;

/// A page transitioned to published.
pub const PAGE_PUBLISHED: &str = "page.published";

/// A contact form was submitted.
pub const FORM_SUBMITTED: &str = "form.submitted";

/// A listing was created, changed or removed.
pub const LISTING_UPDATED: &str = "listing.updated";

/// A lifecycle event with its tenant scope and payload.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: String,
    pub tenant: TenantId,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(kind: impl Into<String>, tenant: TenantId, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            tenant,
            payload,
            timestamp: Utc::now(),
        }
    }
}

type Handler = Box<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Synchronous in-process pub/sub.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event kind. Handlers fire in registration
    /// order.
    pub fn on<F>(&self, kind: &str, handler: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(kind.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    /// Emit an event to all handlers registered for its kind.
    ///
    /// Returns the number of handlers invoked. Handler errors are logged and
    /// swallowed so one bad listener cannot affect the emitter or its
    /// siblings.
    pub fn emit(&self, event: &Event) -> usize {
        let handlers = self.handlers.read();
        let Some(registered) = handlers.get(&event.kind) else {
            debug!(kind = %event.kind, "no handlers registered for event");
            return 0;
        };

        for handler in registered {
            if let Err(err) = handler(event) {
                error!(
                    kind = %event.kind,
                    tenant = %event.tenant,
                    error = %err,
                    "event handler failed"
                );
            }
        }

        debug!(
            kind = %event.kind,
            tenant = %event.tenant,
            handlers = registered.len(),
            "event dispatched"
        );
        registered.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    fn event(kind: &str) -> Event {
        Event::new(kind, TenantId::new("acme"), json!({ "slug": "home" }))
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["primero", "segundo", "tercero"] {
            let order = Arc::clone(&order);
            bus.on(PAGE_PUBLISHED, move |_| {
                order.lock().push(label);
                Ok(())
            });
        }

        let invoked = bus.emit(&event(PAGE_PUBLISHED));
        assert_eq!(invoked, 3);
        assert_eq!(*order.lock(), vec!["primero", "segundo", "tercero"]);
    }

    #[test]
    fn handler_error_does_not_stop_siblings() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.on(FORM_SUBMITTED, |_| anyhow::bail!("se rompió"));
        let c = Arc::clone(&count);
        bus.on(FORM_SUBMITTED, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(&event(FORM_SUBMITTED));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emit_without_handlers_is_a_no_op() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(&event(LISTING_UPDATED)), 0);
    }

    #[test]
    fn handlers_are_scoped_by_kind() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        bus.on(PAGE_PUBLISHED, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(&event(FORM_SUBMITTED));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        bus.emit(&event(PAGE_PUBLISHED));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_receives_the_event_payload() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));

        let s = Arc::clone(&seen);
        bus.on(PAGE_PUBLISHED, move |event| {
            *s.lock() = Some((event.tenant.clone(), event.payload.clone()));
            Ok(())
        });

        bus.emit(&event(PAGE_PUBLISHED));
        let (tenant, payload) = seen.lock().clone().unwrap();
        assert_eq!(tenant, TenantId::new("acme"));
        assert_eq!(payload["slug"], "home");
    }
}
