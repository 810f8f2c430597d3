//! Analytics emitter — fire-and-forget domain events.
//!
//! Emission failure must NEVER fail the parent operation: a redemption that
//! happened, happened, whether or not the analytics row landed. Failures are
//! logged and dropped.

use chrono::{DateTime, Utc};
use offerpass_types::{AnalyticsEvent, EventType};

use crate::store::RedemptionStore;

/// Writes domain events into the store's append-only trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEmitter;

impl AnalyticsEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Append an event. Infallible from the caller's point of view.
    pub fn emit(
        &self,
        store: &mut RedemptionStore,
        event_type: EventType,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let event = AnalyticsEvent::new(event_type, payload, now);
        if let Err(err) = store.append_event(event) {
            tracing::warn!(%event_type, %err, "analytics emission failed, dropping event");
        }
    }
}
