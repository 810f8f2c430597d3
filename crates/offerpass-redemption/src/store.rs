//! Persistent store for entitlements, redemptions, and the catalog.
//!
//! This is the transactional seam of the redemption plane. Entitlement state
//! never changes except through [`RedemptionStore::cas_entitlement`] — the
//! compare-and-swap primitive every lifecycle transition rides on — and the
//! two multi-step mutations ([`record_confirmation`], [`record_void`]) are
//! atomic: they either fully apply or leave nothing behind.
//!
//! The daily unique index enforces the core invariant: at most one
//! non-VOIDED entitlement per (user, offer, local calendar day). The index
//! key's calendar day is computed in the store's configured zone, the same
//! way a relational index over `date(claimed_at)` would be.
//!
//! [`record_confirmation`]: RedemptionStore::record_confirmation
//! [`record_void`]: RedemptionStore::record_void

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

use offerpass_types::{
    AnalyticsEvent, Entitlement, EntitlementId, EntitlementState, Merchant, MerchantId, Offer,
    OfferId, OfferpassError, Redemption, RedemptionId, Result, User, UserId, clock::local_date,
};

/// Aggregate savings for one user across non-voided redemptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavingsSummary {
    pub total_redemptions: usize,
    pub total_savings: Decimal,
    pub total_spent: Decimal,
}

/// Aggregate redemptions for one merchant on one local calendar day,
/// excluding voided rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantDaySummary {
    pub redemption_count: usize,
    pub gross_billed: Decimal,
    pub total_discount: Decimal,
}

/// In-memory transactional store with row-level consistency per entitlement.
#[derive(Debug)]
pub struct RedemptionStore {
    entitlements: HashMap<EntitlementId, Entitlement>,
    redemptions: HashMap<RedemptionId, Redemption>,
    redemption_by_entitlement: HashMap<EntitlementId, RedemptionId>,
    offers: HashMap<OfferId, Offer>,
    merchants: HashMap<MerchantId, Merchant>,
    users: HashMap<UserId, User>,
    analytics_events: Vec<AnalyticsEvent>,
    /// (user, offer, local day) pairs holding a non-VOIDED entitlement.
    daily_index: HashSet<(UserId, OfferId, NaiveDate)>,
    /// Zone the index's calendar day is computed in.
    tz: Tz,
    analytics_available: bool,
}

impl RedemptionStore {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self {
            entitlements: HashMap::new(),
            redemptions: HashMap::new(),
            redemption_by_entitlement: HashMap::new(),
            offers: HashMap::new(),
            merchants: HashMap::new(),
            users: HashMap::new(),
            analytics_events: Vec::new(),
            daily_index: HashSet::new(),
            tz,
            analytics_available: true,
        }
    }

    fn index_key(&self, ent: &Entitlement) -> (UserId, OfferId, NaiveDate) {
        (ent.user_id, ent.offer_id, local_date(ent.claimed_at, self.tz))
    }

    // =====================================================================
    // Catalog (read-only to the core, seeded from outside)
    // =====================================================================

    pub fn seed_offer(&mut self, offer: Offer) {
        self.offers.insert(offer.id, offer);
    }

    pub fn seed_merchant(&mut self, merchant: Merchant) {
        self.merchants.insert(merchant.id, merchant);
    }

    pub fn seed_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    #[must_use]
    pub fn offer(&self, id: OfferId) -> Option<Offer> {
        self.offers.get(&id).cloned()
    }

    #[must_use]
    pub fn merchant(&self, id: MerchantId) -> Option<Merchant> {
        self.merchants.get(&id).cloned()
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).cloned()
    }

    /// Best-effort bump of the offer's claim counter. Races on this counter
    /// are acceptable; the entitlements table is the ground truth.
    pub fn increment_offer_claims(&mut self, id: OfferId) {
        if let Some(offer) = self.offers.get_mut(&id) {
            offer.total_claims = offer.total_claims.saturating_add(1);
        }
    }

    // =====================================================================
    // Entitlements
    // =====================================================================

    #[must_use]
    pub fn entitlement(&self, id: EntitlementId) -> Option<Entitlement> {
        self.entitlements.get(&id).cloned()
    }

    /// Insert a fresh entitlement, enforcing daily uniqueness.
    ///
    /// # Errors
    /// `DailyClaimLimit` when a non-VOIDED entitlement already exists for
    /// this (user, offer, local day).
    pub fn insert_entitlement(&mut self, ent: Entitlement) -> Result<()> {
        let key = self.index_key(&ent);
        if self.daily_index.contains(&key) {
            return Err(OfferpassError::DailyClaimLimit);
        }
        self.daily_index.insert(key);
        self.entitlements.insert(ent.id, ent);
        Ok(())
    }

    /// Conditional state update: apply `to` only if the row is still in
    /// `from`. The closure adjusts row fields (timestamps) alongside the
    /// state change; `updated_at` is maintained here.
    ///
    /// Moving to VOIDED releases the row's daily-index entry so the user may
    /// claim the offer again the same day.
    ///
    /// # Errors
    /// - `EntitlementNotFound` when the row is absent.
    /// - `InvalidTransition` when the current state no longer matches
    ///   `from` (a concurrent actor won the race).
    pub fn cas_entitlement(
        &mut self,
        id: EntitlementId,
        from: EntitlementState,
        to: EntitlementState,
        event: &'static str,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Entitlement),
    ) -> Result<Entitlement> {
        let key = {
            let ent = self
                .entitlements
                .get(&id)
                .ok_or(OfferpassError::EntitlementNotFound(id))?;
            if ent.state != from {
                return Err(OfferpassError::InvalidTransition {
                    from: ent.state,
                    event,
                });
            }
            self.index_key(ent)
        };

        let ent = self
            .entitlements
            .get_mut(&id)
            .ok_or(OfferpassError::EntitlementNotFound(id))?;
        ent.state = to;
        ent.updated_at = now;
        apply(ent);

        if to == EntitlementState::Voided {
            self.daily_index.remove(&key);
        }
        Ok(ent.clone())
    }

    /// Entitlements ripe for the expiry sweep: open states past `expires_at`.
    #[must_use]
    pub fn sweep_due(&self, now: DateTime<Utc>) -> Vec<EntitlementId> {
        let mut due: Vec<_> = self
            .entitlements
            .values()
            .filter(|ent| ent.sweepable(now))
            .map(|ent| ent.id)
            .collect();
        due.sort_unstable();
        due
    }

    /// A user's entitlements, newest claim first, optionally filtered by state.
    #[must_use]
    pub fn entitlements_for_user(
        &self,
        user_id: UserId,
        state: Option<EntitlementState>,
    ) -> Vec<Entitlement> {
        let mut rows: Vec<_> = self
            .entitlements
            .values()
            .filter(|ent| ent.user_id == user_id)
            .filter(|ent| state.is_none_or(|s| ent.state == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
        rows
    }

    /// Non-VOIDED entitlement count for (user, offer, day). Invariant probe.
    #[must_use]
    pub fn non_voided_count(&self, user_id: UserId, offer_id: OfferId, day: NaiveDate) -> usize {
        self.entitlements
            .values()
            .filter(|ent| {
                ent.user_id == user_id
                    && ent.offer_id == offer_id
                    && local_date(ent.claimed_at, self.tz) == day
                    && ent.state != EntitlementState::Voided
            })
            .count()
    }

    // =====================================================================
    // Redemptions
    // =====================================================================

    #[must_use]
    pub fn redemption(&self, id: RedemptionId) -> Option<Redemption> {
        self.redemptions.get(&id).cloned()
    }

    #[must_use]
    pub fn redemption_for_entitlement(&self, id: EntitlementId) -> Option<Redemption> {
        self.redemption_by_entitlement
            .get(&id)
            .and_then(|rid| self.redemptions.get(rid))
            .cloned()
    }

    /// Atomically record a confirmation: insert the redemption row and move
    /// the entitlement PENDING_CONFIRMATION -> USED with `used_at` set.
    ///
    /// # Errors
    /// Propagates the CAS failure untouched; no redemption row is written
    /// when the entitlement is not in PENDING_CONFIRMATION.
    pub fn record_confirmation(
        &mut self,
        redemption: Redemption,
        now: DateTime<Utc>,
    ) -> Result<Entitlement> {
        let entitlement_id = redemption.entitlement_id;
        // CAS first: a failed swap must leave no redemption row behind.
        let ent = self.cas_entitlement(
            entitlement_id,
            EntitlementState::PendingConfirmation,
            EntitlementState::Used,
            "confirm",
            now,
            |ent| ent.used_at = Some(now),
        )?;
        self.redemption_by_entitlement
            .insert(entitlement_id, redemption.id);
        self.redemptions.insert(redemption.id, redemption);
        Ok(ent)
    }

    /// Atomically void a confirmed redemption: flag the redemption row and
    /// move the entitlement USED -> VOIDED with `voided_at` set. The daily
    /// index entry is released inside the CAS.
    ///
    /// # Errors
    /// - `EntitlementNotFound` / `InvalidTransition` from the CAS.
    /// - `Internal` when a USED entitlement has no live redemption row.
    pub fn record_void(
        &mut self,
        entitlement_id: EntitlementId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(Entitlement, Redemption)> {
        let redemption_id = self
            .redemption_by_entitlement
            .get(&entitlement_id)
            .copied()
            .filter(|rid| {
                self.redemptions
                    .get(rid)
                    .is_some_and(|r| !r.is_voided)
            })
            .ok_or_else(|| {
                OfferpassError::Internal(format!(
                    "no live redemption for entitlement {entitlement_id}"
                ))
            })?;

        let ent = self.cas_entitlement(
            entitlement_id,
            EntitlementState::Used,
            EntitlementState::Voided,
            "void",
            now,
            |ent| ent.voided_at = Some(now),
        )?;

        let redemption = self
            .redemptions
            .get_mut(&redemption_id)
            .ok_or_else(|| OfferpassError::Internal("redemption row vanished".to_string()))?;
        redemption.mark_voided(now, reason);
        Ok((ent, redemption.clone()))
    }

    /// A user's savings across non-voided redemptions.
    #[must_use]
    pub fn user_savings_summary(&self, user_id: UserId) -> SavingsSummary {
        let rows = self
            .redemptions
            .values()
            .filter(|r| r.user_id == user_id && !r.is_voided);
        let mut summary = SavingsSummary {
            total_redemptions: 0,
            total_savings: Decimal::ZERO,
            total_spent: Decimal::ZERO,
        };
        for row in rows {
            summary.total_redemptions += 1;
            summary.total_savings += row.discount_amount;
            summary.total_spent += row.final_amount;
        }
        summary
    }

    /// A merchant's non-voided redemptions for one local calendar day.
    #[must_use]
    pub fn merchant_day_summary(&self, merchant_id: MerchantId, day: NaiveDate) -> MerchantDaySummary {
        let rows = self.redemptions.values().filter(|r| {
            r.merchant_id == merchant_id
                && !r.is_voided
                && local_date(r.redeemed_at, self.tz) == day
        });
        let mut summary = MerchantDaySummary {
            redemption_count: 0,
            gross_billed: Decimal::ZERO,
            total_discount: Decimal::ZERO,
        };
        for row in rows {
            summary.redemption_count += 1;
            summary.gross_billed += row.total_bill;
            summary.total_discount += row.discount_amount;
        }
        summary
    }

    // =====================================================================
    // Analytics
    // =====================================================================

    /// Toggle the analytics table's availability (outage simulation).
    pub fn set_analytics_available(&mut self, available: bool) {
        self.analytics_available = available;
    }

    /// Append to the analytics trail.
    ///
    /// # Errors
    /// `StoreUnavailable` while the table is toggled off.
    pub fn append_event(&mut self, event: AnalyticsEvent) -> Result<()> {
        if !self.analytics_available {
            return Err(OfferpassError::StoreUnavailable);
        }
        self.analytics_events.push(event);
        Ok(())
    }

    #[must_use]
    pub fn analytics_events(&self) -> &[AnalyticsEvent] {
        &self.analytics_events
    }
}
