//! Analytics event model.
//!
//! Events are an append-only audit trail keyed by a closed event type with a
//! free-form JSON payload. Emission is fire-and-forget: a failed write never
//! fails the operation that produced the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EventId;

/// Closed set of domain events the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    OfferClaim,
    RedemptionConfirmed,
    RedemptionVoided,
    EntitlementExpired,
}

impl EventType {
    /// Canonical persistence form (snake_case, matches the events table).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OfferClaim => "offer_claim",
            Self::RedemptionConfirmed => "redemption_confirmed",
            Self::RedemptionVoided => "redemption_voided",
            Self::EntitlementExpired => "entitlement_expired",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analytics event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    #[must_use]
    pub fn new(event_type: EventType, payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            payload,
            created_at: now,
        }
    }
}
