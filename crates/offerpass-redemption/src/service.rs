//! Redemption service — the one component that mutates entitlements.
//!
//! Orchestrates the full lifecycle across the planes:
//!
//! ```text
//! claim    : limiter -> offer eligibility -> daily ledger -> insert -> marker
//! prove    : ownership -> lifecycle check -> token broker (no state change)
//! validate : token consume -> CAS ACTIVE -> PENDING -> device binding -> display
//! confirm  : lifecycle check -> savings -> redemption row + CAS -> USED
//! void     : lifecycle check (window, same day) -> void row + CAS -> VOIDED
//! sweep    : expiry scan -> CAS per row -> EXPIRED
//! ```
//!
//! Every state change goes through the store's compare-and-swap, so a row
//! re-read mid-operation can never be silently overwritten: the loser of any
//! race gets a typed rejection, never a double redemption.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use offerpass_gateway::{DailyClaimLedger, IssuedToken, KvStore, RateLimiter, TokenBroker, TokenRecord};
use offerpass_lifecycle::{LifecycleEvent, TransitionContext, evaluate};
use offerpass_types::{
    Clock, DeviceId, Entitlement, EntitlementId, EntitlementState, EventType, Merchant, MerchantId,
    Offer, OfferId, OfferpassError, ProofToken, Redemption, RedemptionConfig, RedemptionId, Result,
    User, UserId,
    clock::{end_of_local_day, local_date, local_time, local_weekday},
};

use crate::analytics::AnalyticsEmitter;
use crate::store::{MerchantDaySummary, RedemptionStore, SavingsSummary};

/// Result of a successful claim.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub entitlement_id: EntitlementId,
    pub expires_at: DateTime<Utc>,
}

/// Display fields a terminal sees on a passing validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationPass {
    pub entitlement_id: EntitlementId,
    pub offer_title: String,
    pub offer_type: &'static str,
    pub discount_value: String,
    pub merchant_name: String,
    pub student_name: String,
}

/// Result of a confirmed redemption.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub redemption_id: RedemptionId,
    pub entitlement_id: EntitlementId,
    pub total_bill: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub redeemed_at: DateTime<Utc>,
}

/// Result of a void.
#[derive(Debug, Clone, Serialize)]
pub struct VoidOutcome {
    pub entitlement_id: EntitlementId,
    pub voided_at: DateTime<Utc>,
}

/// One row of a user's entitlement list.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementListItem {
    pub id: EntitlementId,
    pub offer_title: String,
    pub merchant_name: String,
    pub state: EntitlementState,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Owner-scoped detail view of one entitlement.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementDetail {
    pub id: EntitlementId,
    pub offer_id: OfferId,
    pub offer_title: String,
    pub merchant_name: String,
    pub state: EntitlementState,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub device_bound: bool,
}

/// Orchestrates claim, prove, validate, confirm, void, and sweep.
pub struct RedemptionService {
    config: RedemptionConfig,
    store: RedemptionStore,
    kv: Arc<KvStore>,
    limiter: RateLimiter,
    ledger: DailyClaimLedger,
    broker: TokenBroker,
    emitter: AnalyticsEmitter,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    #[must_use]
    pub fn new(config: RedemptionConfig, kv: Arc<KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: RedemptionStore::new(config.local_timezone),
            limiter: RateLimiter::from_config(&config),
            ledger: DailyClaimLedger::new(),
            broker: TokenBroker::from_config(&config),
            emitter: AnalyticsEmitter::new(),
            config,
            kv,
            clock,
        }
    }

    /// Read access for probes and tests.
    #[must_use]
    pub fn store(&self) -> &RedemptionStore {
        &self.store
    }

    pub fn seed_offer(&mut self, offer: Offer) {
        self.store.seed_offer(offer);
    }

    pub fn seed_merchant(&mut self, merchant: Merchant) {
        self.store.seed_merchant(merchant);
    }

    pub fn seed_user(&mut self, user: User) {
        self.store.seed_user(user);
    }

    fn transition_ctx(&self, ent: &Entitlement, now: DateTime<Utc>) -> TransitionContext {
        TransitionContext {
            now,
            expires_at: ent.expires_at,
            used_at: ent.used_at,
            void_window: self.config.void_window(),
            tz: self.config.local_timezone,
        }
    }

    fn load_entitlement(&self, id: EntitlementId) -> Result<Entitlement> {
        self.store
            .entitlement(id)
            .ok_or(OfferpassError::EntitlementNotFound(id))
    }

    // =====================================================================
    // Claim
    // =====================================================================

    /// Claim an offer for `user_id`, minting an ACTIVE entitlement that
    /// expires at the end of the local day.
    pub fn claim(
        &mut self,
        user_id: UserId,
        offer_id: OfferId,
        device_id: Option<DeviceId>,
    ) -> Result<ClaimOutcome> {
        let now = self.clock.now();
        let tz = self.config.local_timezone;

        self.limiter.check(&self.kv, user_id, now, tz)?;

        let offer = self
            .store
            .offer(offer_id)
            .ok_or(OfferpassError::OfferNotFound(offer_id))?;
        self.check_offer_eligibility(&offer, now)?;

        if self
            .ledger
            .already_claimed(&self.kv, user_id, offer_id, now, tz)?
        {
            return Err(OfferpassError::DailyClaimLimit);
        }

        let ent = Entitlement::claim(user_id, offer_id, device_id, now, end_of_local_day(now, tz));
        let entitlement_id = ent.id;
        let expires_at = ent.expires_at;
        // The unique index catches anything that slipped past the marker.
        self.store.insert_entitlement(ent)?;

        self.ledger.mark_claimed(&self.kv, user_id, offer_id, now, tz);
        self.store.increment_offer_claims(offer_id);
        self.emitter.emit(
            &mut self.store,
            EventType::OfferClaim,
            json!({
                "user_id": user_id,
                "offer_id": offer_id,
                "entitlement_id": entitlement_id,
            }),
            now,
        );
        tracing::info!(%entitlement_id, %user_id, %offer_id, "entitlement claimed");

        Ok(ClaimOutcome {
            entitlement_id,
            expires_at,
        })
    }

    fn check_offer_eligibility(&self, offer: &Offer, now: DateTime<Utc>) -> Result<()> {
        let tz = self.config.local_timezone;
        if !offer.is_active {
            return Err(OfferpassError::OfferNotActive);
        }
        if !offer.is_within_validity(now) {
            return Err(OfferpassError::OfferOutsideValidity);
        }
        if !offer.is_within_daily_window(local_time(now, tz)) {
            return Err(OfferpassError::OfferOutsideDailyWindow);
        }
        if !offer.is_valid_on(local_weekday(now, tz)) {
            return Err(OfferpassError::OfferNotValidToday);
        }
        if !offer.has_claim_capacity() {
            return Err(OfferpassError::OfferClaimCapReached);
        }
        // Percentage descriptors must parse now, not at confirmation time.
        if offer.offer_type == offerpass_types::OfferType::Percentage {
            offer.percentage()?;
        }
        Ok(())
    }

    // =====================================================================
    // Prove
    // =====================================================================

    /// Mint a 30 s single-use proof token for an ACTIVE entitlement owned by
    /// `caller`. State is not mutated.
    pub fn prove(&mut self, caller: UserId, entitlement_id: EntitlementId) -> Result<IssuedToken> {
        let now = self.clock.now();
        let ent = self.load_entitlement(entitlement_id)?;
        if ent.user_id != caller {
            return Err(OfferpassError::NotEntitlementOwner);
        }
        evaluate(ent.state, LifecycleEvent::Prove, &self.transition_ctx(&ent, now))?;

        self.broker.issue(
            &self.kv,
            TokenRecord {
                entitlement_id: ent.id,
                user_id: ent.user_id,
                offer_id: ent.offer_id,
                device_id: ent.device_id.clone(),
                issued_at: now,
            },
            now,
        )
    }

    // =====================================================================
    // Validate
    // =====================================================================

    /// Consume a proof token and move the entitlement to
    /// PENDING_CONFIRMATION. Concurrent terminals racing on the same token
    /// produce at most one winner.
    ///
    /// All state problems collapse into `TokenInvalidOrExpired` so a probing
    /// terminal learns nothing; only `DeviceMismatch` and transient
    /// infrastructure failures surface distinctly.
    pub fn validate(
        &mut self,
        token: &ProofToken,
        terminal_device: Option<&DeviceId>,
    ) -> Result<ValidationPass> {
        let now = self.clock.now();

        let record = self
            .broker
            .consume(&self.kv, token, now)?
            .ok_or(OfferpassError::TokenInvalidOrExpired)?;

        let ent = self
            .store
            .entitlement(record.entitlement_id)
            .ok_or(OfferpassError::TokenInvalidOrExpired)?;

        match evaluate(ent.state, LifecycleEvent::Validate, &self.transition_ctx(&ent, now)) {
            Ok(_) => {}
            Err(
                OfferpassError::InvalidTransition { .. } | OfferpassError::EntitlementExpired,
            ) => return Err(OfferpassError::TokenInvalidOrExpired),
            Err(other) => return Err(other),
        }

        // The CAS is the actual race arbiter; its loser does not get the
        // token back.
        self.store
            .cas_entitlement(
                ent.id,
                EntitlementState::Active,
                EntitlementState::PendingConfirmation,
                "validate",
                now,
                |_| {},
            )
            .map_err(|_| OfferpassError::TokenInvalidOrExpired)?;

        // Device binding: enforced only when both sides carry a device.
        if let (Some(bound), Some(claimed)) = (&record.device_id, terminal_device) {
            if bound != claimed {
                let _ = self.store.cas_entitlement(
                    ent.id,
                    EntitlementState::PendingConfirmation,
                    EntitlementState::Active,
                    "cancel_validation",
                    now,
                    |_| {},
                );
                tracing::warn!(entitlement_id = %ent.id, "device binding failed on validate");
                return Err(OfferpassError::DeviceMismatch);
            }
        }

        let offer = self
            .store
            .offer(ent.offer_id)
            .ok_or_else(|| OfferpassError::Internal("offer vanished from catalog".to_string()))?;
        let merchant = self.store.merchant(offer.merchant_id).ok_or_else(|| {
            OfferpassError::Internal("merchant vanished from catalog".to_string())
        })?;
        let student_name = self
            .store
            .user(ent.user_id)
            .map_or_else(|| "Student".to_string(), |u| u.display_name);

        tracing::info!(entitlement_id = %ent.id, merchant = %merchant.name, "token validated");
        Ok(ValidationPass {
            entitlement_id: ent.id,
            offer_title: offer.title,
            offer_type: offer.offer_type.as_str(),
            discount_value: offer.discount_value,
            merchant_name: merchant.name,
            student_name,
        })
    }

    // =====================================================================
    // Confirm
    // =====================================================================

    /// Capture the bill and confirm the redemption:
    /// PENDING_CONFIRMATION -> USED plus an immutable redemption row, in one
    /// transaction.
    pub fn confirm(
        &mut self,
        entitlement_id: EntitlementId,
        total_bill: Decimal,
        declared_final: Option<Decimal>,
    ) -> Result<ConfirmOutcome> {
        let now = self.clock.now();
        let ent = self.load_entitlement(entitlement_id)?;
        evaluate(ent.state, LifecycleEvent::Confirm, &self.transition_ctx(&ent, now))?;

        let offer = self
            .store
            .offer(ent.offer_id)
            .ok_or(OfferpassError::OfferNotFound(ent.offer_id))?;
        let savings = offerpass_lifecycle::compute_savings(&offer, total_bill, declared_final)?;

        let redemption = Redemption::record(
            ent.id,
            offer.merchant_id,
            offer.id,
            ent.user_id,
            total_bill,
            savings.discount,
            savings.final_amount,
            offer.offer_type,
            now,
        );
        let redemption_id = redemption.id;
        self.store.record_confirmation(redemption, now)?;

        self.emitter.emit(
            &mut self.store,
            EventType::RedemptionConfirmed,
            json!({
                "user_id": ent.user_id,
                "offer_id": offer.id,
                "merchant_id": offer.merchant_id,
                "entitlement_id": ent.id,
                "redemption_id": redemption_id,
                "savings": savings.discount,
            }),
            now,
        );
        tracing::info!(%redemption_id, entitlement_id = %ent.id, savings = %savings.discount, "redemption confirmed");

        Ok(ConfirmOutcome {
            redemption_id,
            entitlement_id: ent.id,
            total_bill,
            discount_amount: savings.discount,
            final_amount: savings.final_amount,
            redeemed_at: now,
        })
    }

    // =====================================================================
    // Void
    // =====================================================================

    /// Reverse a confirmed redemption inside the void window (same local
    /// day). Terminal for the entitlement; the user may claim the offer
    /// again the same day.
    pub fn void(&mut self, entitlement_id: EntitlementId, reason: &str) -> Result<VoidOutcome> {
        let now = self.clock.now();
        let tz = self.config.local_timezone;
        let ent = self.load_entitlement(entitlement_id)?;
        evaluate(ent.state, LifecycleEvent::Void, &self.transition_ctx(&ent, now))?;

        let (voided, redemption) = self.store.record_void(entitlement_id, reason, now)?;

        // Reopen the daily fast path; the index entry is already released.
        self.ledger.clear_claim(
            &self.kv,
            voided.user_id,
            voided.offer_id,
            local_date(voided.claimed_at, tz),
            now,
        );

        self.emitter.emit(
            &mut self.store,
            EventType::RedemptionVoided,
            json!({
                "user_id": voided.user_id,
                "entitlement_id": voided.id,
                "redemption_id": redemption.id,
                "reason": reason,
            }),
            now,
        );
        tracing::info!(entitlement_id = %voided.id, redemption_id = %redemption.id, "redemption voided");

        Ok(VoidOutcome {
            entitlement_id: voided.id,
            voided_at: now,
        })
    }

    // =====================================================================
    // Cancel validation
    // =====================================================================

    /// Abandon a pending scan: PENDING_CONFIRMATION -> ACTIVE. The dedicated
    /// path for a terminal backing out before confirmation.
    pub fn cancel_validation(&mut self, entitlement_id: EntitlementId) -> Result<()> {
        let now = self.clock.now();
        let ent = self.load_entitlement(entitlement_id)?;
        evaluate(
            ent.state,
            LifecycleEvent::CancelValidation,
            &self.transition_ctx(&ent, now),
        )?;
        self.store.cas_entitlement(
            ent.id,
            EntitlementState::PendingConfirmation,
            EntitlementState::Active,
            "cancel_validation",
            now,
            |_| {},
        )?;
        tracing::info!(entitlement_id = %ent.id, "validation cancelled");
        Ok(())
    }

    // =====================================================================
    // Sweep
    // =====================================================================

    /// Retire stale entitlements: every open row past its expiry moves to
    /// EXPIRED. Idempotent — a second run finds nothing to do.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let due = self.store.sweep_due(now);
        let mut swept = 0;
        for id in due {
            let Some(ent) = self.store.entitlement(id) else {
                continue;
            };
            if evaluate(ent.state, LifecycleEvent::Sweep, &self.transition_ctx(&ent, now)).is_err()
            {
                continue;
            }
            // A racing confirm/void between scan and CAS simply wins.
            if self
                .store
                .cas_entitlement(id, ent.state, EntitlementState::Expired, "sweep", now, |_| {})
                .is_ok()
            {
                swept += 1;
                self.emitter.emit(
                    &mut self.store,
                    EventType::EntitlementExpired,
                    json!({
                        "user_id": ent.user_id,
                        "offer_id": ent.offer_id,
                        "entitlement_id": ent.id,
                    }),
                    now,
                );
            }
        }
        if swept > 0 {
            tracing::info!(swept, "expiry sweep finished");
        }
        swept
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// A user's entitlements with display fields, newest first.
    #[must_use]
    pub fn entitlements_for(
        &self,
        user_id: UserId,
        state: Option<EntitlementState>,
    ) -> Vec<EntitlementListItem> {
        self.store
            .entitlements_for_user(user_id, state)
            .into_iter()
            .map(|ent| {
                let (offer_title, merchant_name) = self.display_fields(ent.offer_id);
                EntitlementListItem {
                    id: ent.id,
                    offer_title,
                    merchant_name,
                    state: ent.state,
                    claimed_at: ent.claimed_at,
                    expires_at: ent.expires_at,
                }
            })
            .collect()
    }

    /// Owner-scoped detail for one entitlement.
    pub fn entitlement_detail(
        &self,
        caller: UserId,
        entitlement_id: EntitlementId,
    ) -> Result<EntitlementDetail> {
        let ent = self.load_entitlement(entitlement_id)?;
        if ent.user_id != caller {
            return Err(OfferpassError::NotEntitlementOwner);
        }
        let (offer_title, merchant_name) = self.display_fields(ent.offer_id);
        Ok(EntitlementDetail {
            id: ent.id,
            offer_id: ent.offer_id,
            offer_title,
            merchant_name,
            state: ent.state,
            claimed_at: ent.claimed_at,
            expires_at: ent.expires_at,
            used_at: ent.used_at,
            voided_at: ent.voided_at,
            device_bound: ent.device_id.is_some(),
        })
    }

    fn display_fields(&self, offer_id: OfferId) -> (String, String) {
        match self.store.offer(offer_id) {
            Some(offer) => {
                let merchant_name = self
                    .store
                    .merchant(offer.merchant_id)
                    .map_or_else(|| "Unknown Merchant".to_string(), |m| m.name);
                (offer.title, merchant_name)
            }
            None => ("Unknown Offer".to_string(), "Unknown Merchant".to_string()),
        }
    }

    /// A user's lifetime savings across non-voided redemptions.
    #[must_use]
    pub fn savings_summary(&self, user_id: UserId) -> SavingsSummary {
        self.store.user_savings_summary(user_id)
    }

    /// A merchant's non-voided redemptions for one local day.
    #[must_use]
    pub fn merchant_day_summary(
        &self,
        merchant_id: MerchantId,
        day: NaiveDate,
    ) -> MerchantDaySummary {
        self.store.merchant_day_summary(merchant_id, day)
    }
}
