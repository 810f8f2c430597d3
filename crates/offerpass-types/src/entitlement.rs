//! # Entitlement — the central redemption ticket
//!
//! An `Entitlement` is a per-(user, offer) ticket minted by a claim. While
//! ACTIVE it can be presented for exactly one redemption.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  validate   ┌──────────────────────┐  confirm   ┌──────┐
//!   │ ACTIVE ├────────────▶│ PENDING_CONFIRMATION ├───────────▶│ USED │
//!   └───┬────┘             └──────────┬───────────┘            └──┬───┘
//!       │                             │ cancel / timeout          │ void (2h, same day)
//!       │                             ▼                           ▼
//!       │                        back to ACTIVE              ┌────────┐
//!       │ sweep (past expiry)                                │ VOIDED │
//!       ▼                                                    └────────┘
//!   ┌─────────┐   (PENDING_CONFIRMATION sweeps here too)
//!   │ EXPIRED │
//!   └─────────┘
//! ```
//!
//! VOIDED and EXPIRED are terminal. Prove does not change state — it only
//! mints a proof token for an ACTIVE, unexpired entitlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeviceId, EntitlementId, OfferId, OfferpassError, Result, UserId};

/// The lifecycle state of an entitlement.
///
/// Persisted and transported as strings; closed over this enum everywhere
/// inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntitlementState {
    /// Claimed and waiting to be presented. Proof tokens can be minted.
    Active,
    /// A merchant scan consumed a proof token; awaiting bill confirmation.
    PendingConfirmation,
    /// Redemption confirmed. The redemption row holds the captured amounts.
    Used,
    /// The redemption was reversed within the void window. **Terminal.**
    Voided,
    /// The end-of-day expiry passed before redemption. **Terminal.**
    Expired,
}

impl EntitlementState {
    /// Can this entitlement transition to the given target state?
    ///
    /// This is the raw reachability DAG; time-dependent guards (expiry,
    /// void window) live in the lifecycle plane.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::PendingConfirmation | Self::Expired)
                | (Self::PendingConfirmation, Self::Used | Self::Active | Self::Expired)
                | (Self::Used, Self::Voided)
        )
    }

    /// Terminal states accept no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Voided | Self::Expired)
    }

    /// Canonical wire/persistence form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::PendingConfirmation => "PENDING_CONFIRMATION",
            Self::Used => "USED",
            Self::Voided => "VOIDED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Parse the canonical wire form.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for unknown state strings.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "ACTIVE" => Ok(Self::Active),
            "PENDING_CONFIRMATION" => Ok(Self::PendingConfirmation),
            "USED" => Ok(Self::Used),
            "VOIDED" => Ok(Self::Voided),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(OfferpassError::InvalidRequest {
                reason: format!("unknown entitlement state {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for EntitlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entitlement row. Owned and mutated exclusively by the redemption
/// service; every state change goes through a conditional (compare-and-swap)
/// store update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    /// Globally unique entitlement identifier.
    pub id: EntitlementId,
    /// The owning user. Entitlements are not transferable.
    pub user_id: UserId,
    /// The claimed offer.
    pub offer_id: OfferId,
    /// Device recorded at claim time, when the app supplied one.
    pub device_id: Option<DeviceId>,
    /// Current lifecycle state.
    pub state: EntitlementState,
    /// When the claim happened.
    pub claimed_at: DateTime<Utc>,
    /// End of the local calendar day of the claim.
    pub expires_at: DateTime<Utc>,
    /// Set when the redemption was confirmed (USED) and kept through VOIDED.
    pub used_at: Option<DateTime<Utc>>,
    /// Set only when the entitlement reached VOIDED.
    pub voided_at: Option<DateTime<Utc>>,
    /// Audit timestamps.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entitlement {
    /// Build a fresh ACTIVE entitlement at claim time.
    #[must_use]
    pub fn claim(
        user_id: UserId,
        offer_id: OfferId,
        device_id: Option<DeviceId>,
        claimed_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntitlementId::new(),
            user_id,
            offer_id,
            device_id,
            state: EntitlementState::Active,
            claimed_at,
            expires_at,
            used_at: None,
            voided_at: None,
            created_at: claimed_at,
            updated_at: claimed_at,
        }
    }

    /// Whether the end-of-day expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the entitlement is eligible for the expiry sweep.
    #[must_use]
    pub fn sweepable(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(now)
            && matches!(
                self.state,
                EntitlementState::Active | EntitlementState::PendingConfirmation
            )
    }
}

/// Dummy entitlement for tests.
#[cfg(any(test, feature = "test-helpers"))]
impl Entitlement {
    pub fn dummy(user_id: UserId, offer_id: OfferId, now: DateTime<Utc>) -> Self {
        Self::claim(user_id, offer_id, None, now, now + chrono::Duration::hours(12))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_dag_valid_edges() {
        use EntitlementState::*;
        assert!(Active.can_transition_to(PendingConfirmation));
        assert!(Active.can_transition_to(Expired));
        assert!(PendingConfirmation.can_transition_to(Used));
        assert!(PendingConfirmation.can_transition_to(Active));
        assert!(PendingConfirmation.can_transition_to(Expired));
        assert!(Used.can_transition_to(Voided));
    }

    #[test]
    fn transition_dag_invalid_edges() {
        use EntitlementState::*;
        assert!(!Active.can_transition_to(Used));
        assert!(!Active.can_transition_to(Voided));
        assert!(!Used.can_transition_to(Active));
        assert!(!Used.can_transition_to(Expired));
        assert!(!Voided.can_transition_to(Active));
        assert!(!Voided.can_transition_to(Used));
        assert!(!Expired.can_transition_to(Active));
        assert!(!Expired.can_transition_to(PendingConfirmation));
    }

    #[test]
    fn terminal_states() {
        assert!(EntitlementState::Voided.is_terminal());
        assert!(EntitlementState::Expired.is_terminal());
        assert!(!EntitlementState::Active.is_terminal());
        assert!(!EntitlementState::PendingConfirmation.is_terminal());
        assert!(!EntitlementState::Used.is_terminal());
    }

    #[test]
    fn state_string_roundtrip() {
        for state in [
            EntitlementState::Active,
            EntitlementState::PendingConfirmation,
            EntitlementState::Used,
            EntitlementState::Voided,
            EntitlementState::Expired,
        ] {
            assert_eq!(EntitlementState::parse(state.as_str()).unwrap(), state);
        }
        assert!(EntitlementState::parse("REDEEMED").is_err());
    }

    #[test]
    fn claim_builds_active_row() {
        let now = Utc::now();
        let ent = Entitlement::claim(
            UserId::new(),
            OfferId::new(),
            Some(DeviceId::new("device-1")),
            now,
            now + chrono::Duration::hours(6),
        );
        assert_eq!(ent.state, EntitlementState::Active);
        assert!(ent.used_at.is_none());
        assert!(ent.voided_at.is_none());
        assert!(!ent.is_expired(now));
        assert!(ent.is_expired(now + chrono::Duration::hours(7)));
    }

    #[test]
    fn sweepable_only_past_expiry_in_open_states() {
        let now = Utc::now();
        let mut ent = Entitlement::dummy(UserId::new(), OfferId::new(), now);
        let later = ent.expires_at + chrono::Duration::seconds(1);

        assert!(!ent.sweepable(now));
        assert!(ent.sweepable(later));

        ent.state = EntitlementState::PendingConfirmation;
        assert!(ent.sweepable(later));

        ent.state = EntitlementState::Used;
        assert!(!ent.sweepable(later));
    }

    #[test]
    fn serde_roundtrip() {
        let ent = Entitlement::dummy(UserId::new(), OfferId::new(), Utc::now());
        let json = serde_json::to_string(&ent).unwrap();
        let back: Entitlement = serde_json::from_str(&json).unwrap();
        assert_eq!(ent.id, back.id);
        assert_eq!(ent.state, back.state);
        assert_eq!(ent.expires_at, back.expires_at);
    }
}
