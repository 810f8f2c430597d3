//! Daily-claim ledger — the fast path of per-day claim uniqueness.
//!
//! A KV marker per (user, offer, local day) answers the common case in one
//! round trip. The persistent store's unique index remains the ground truth:
//! the marker is only set **after** a store insert succeeds, and a marker
//! that expired early is caught by the index on the contested path.
//!
//! Marker maintenance is best-effort in both directions — a claim whose
//! marker write fails is still protected by the index, and a void whose
//! marker delete fails merely costs the user the fast path until midnight.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use offerpass_types::{
    OfferId, OfferpassError, Result, UserId,
    clock::{local_date, seconds_until_local_midnight},
    constants::KV_PREFIX_DAILY_CLAIM,
};

use crate::kv::KvStore;

/// KV-backed fast path for the daily uniqueness rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyClaimLedger;

impl DailyClaimLedger {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn marker_key(user: UserId, offer: OfferId, day: NaiveDate) -> String {
        format!("{KV_PREFIX_DAILY_CLAIM}{user}:{offer}:{day}")
    }

    /// Whether a claim marker exists for (user, offer, today).
    ///
    /// KV outage answers `false` — the store's unique index decides instead.
    pub fn already_claimed(
        &self,
        kv: &KvStore,
        user: UserId,
        offer: OfferId,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<bool> {
        let key = Self::marker_key(user, offer, local_date(now, tz));
        match kv.get(&key, now) {
            Ok(marker) => Ok(marker.is_some()),
            Err(OfferpassError::KvUnavailable) => {
                tracing::warn!(user = %user, offer = %offer, "kv unavailable, deferring to store index");
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// Record today's claim marker, expiring at local midnight. Best-effort.
    pub fn mark_claimed(
        &self,
        kv: &KvStore,
        user: UserId,
        offer: OfferId,
        now: DateTime<Utc>,
        tz: Tz,
    ) {
        let key = Self::marker_key(user, offer, local_date(now, tz));
        let ttl = chrono::Duration::seconds(seconds_until_local_midnight(now, tz));
        if let Err(err) = kv.set_with_ttl(&key, "1", ttl, now) {
            tracing::warn!(user = %user, offer = %offer, %err, "failed to set daily claim marker");
        }
    }

    /// Drop the marker for the given day (after a void). Best-effort.
    pub fn clear_claim(
        &self,
        kv: &KvStore,
        user: UserId,
        offer: OfferId,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) {
        let key = Self::marker_key(user, offer, day);
        if let Err(err) = kv.delete(&key, now) {
            tracing::warn!(user = %user, offer = %offer, %err, "failed to clear daily claim marker");
        }
    }
}
