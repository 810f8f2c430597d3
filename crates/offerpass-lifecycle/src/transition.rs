//! Pure transition validator for the entitlement lifecycle.
//!
//! The redemption service performs every state change through a conditional
//! store update; this module decides, with no I/O, whether an event is legal
//! from a given state at a given instant. Time-dependent guards (end-of-day
//! expiry, the void window) live here so the rules exist in exactly one
//! place.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use offerpass_types::{
    EntitlementState, OfferpassError, Result,
    clock::same_local_day,
};

/// Events that drive the entitlement lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Student requests a proof token. Does not change state.
    Prove,
    /// A merchant terminal consumed a proof token.
    Validate,
    /// The merchant confirmed the bill.
    Confirm,
    /// The merchant abandoned a scan (or it timed out).
    CancelValidation,
    /// The merchant reversed a confirmed redemption.
    Void,
    /// The periodic sweeper retires a stale entitlement.
    Sweep,
}

impl LifecycleEvent {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prove => "prove",
            Self::Validate => "validate",
            Self::Confirm => "confirm",
            Self::CancelValidation => "cancel_validation",
            Self::Void => "void",
            Self::Sweep => "sweep",
        }
    }
}

/// Everything time-dependent an event decision needs, captured by the caller
/// before calling in. Keeps this module free of clocks and zones-of-record.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    /// The instant the event is happening.
    pub now: DateTime<Utc>,
    /// The entitlement's end-of-day expiry.
    pub expires_at: DateTime<Utc>,
    /// When the redemption was confirmed, if it was.
    pub used_at: Option<DateTime<Utc>>,
    /// How long after `used_at` a void is accepted.
    pub void_window: Duration,
    /// Zone for the same-calendar-day void rule.
    pub tz: Tz,
}

/// Outcome of a legal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event is allowed and leaves the state untouched (prove).
    Stay,
    /// The event moves the entitlement to this state.
    To(EntitlementState),
}

/// Decide whether `event` is legal from `from` under `ctx`.
///
/// # Errors
/// - `InvalidTransition` when the event is not an edge of the lifecycle DAG
///   from this state.
/// - `EntitlementExpired` when prove/validate arrive past end-of-day expiry.
/// - `VoidWindowClosed` when a void misses the window or the calendar day.
pub fn evaluate(
    from: EntitlementState,
    event: LifecycleEvent,
    ctx: &TransitionContext,
) -> Result<Transition> {
    use EntitlementState as S;
    use LifecycleEvent as E;

    let illegal = || OfferpassError::InvalidTransition {
        from,
        event: event.as_str(),
    };

    match event {
        E::Prove => {
            if from != S::Active {
                return Err(illegal());
            }
            if ctx.now >= ctx.expires_at {
                return Err(OfferpassError::EntitlementExpired);
            }
            Ok(Transition::Stay)
        }
        E::Validate => {
            // PENDING_CONFIRMATION here means a replayed or concurrent scan.
            if from != S::Active {
                return Err(illegal());
            }
            if ctx.now >= ctx.expires_at {
                return Err(OfferpassError::EntitlementExpired);
            }
            Ok(Transition::To(S::PendingConfirmation))
        }
        E::Confirm => {
            if from != S::PendingConfirmation {
                return Err(illegal());
            }
            Ok(Transition::To(S::Used))
        }
        E::CancelValidation => {
            if from != S::PendingConfirmation {
                return Err(illegal());
            }
            Ok(Transition::To(S::Active))
        }
        E::Void => {
            if from != S::Used {
                return Err(illegal());
            }
            let used_at = ctx.used_at.ok_or_else(|| {
                OfferpassError::Internal("USED entitlement is missing used_at".to_string())
            })?;
            if !void_permitted(used_at, ctx.now, ctx.void_window, ctx.tz) {
                return Err(OfferpassError::VoidWindowClosed {
                    window_hours: ctx.void_window.num_hours(),
                });
            }
            Ok(Transition::To(S::Voided))
        }
        E::Sweep => {
            if !matches!(from, S::Active | S::PendingConfirmation) {
                return Err(illegal());
            }
            if ctx.now < ctx.expires_at {
                return Err(illegal());
            }
            Ok(Transition::To(S::Expired))
        }
    }
}

/// The single void predicate: within the window after `used_at` **and** on
/// the same local calendar day. Exactly at the window boundary is allowed.
#[must_use]
pub fn void_permitted(
    used_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
    tz: Tz,
) -> bool {
    now <= used_at + window && same_local_day(used_at, now, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Dubai;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn ctx_at(now: &str) -> TransitionContext {
        TransitionContext {
            now: utc(now),
            expires_at: utc("2025-06-01T19:59:59Z"), // 23:59:59 local
            used_at: None,
            void_window: Duration::hours(2),
            tz: Dubai,
        }
    }

    #[test]
    fn prove_from_active_keeps_state() {
        let result = evaluate(
            EntitlementState::Active,
            LifecycleEvent::Prove,
            &ctx_at("2025-06-01T06:00:00Z"),
        );
        assert_eq!(result.unwrap(), Transition::Stay);
    }

    #[test]
    fn prove_rejected_from_every_other_state() {
        for state in [
            EntitlementState::PendingConfirmation,
            EntitlementState::Used,
            EntitlementState::Voided,
            EntitlementState::Expired,
        ] {
            let err = evaluate(state, LifecycleEvent::Prove, &ctx_at("2025-06-01T06:00:00Z"))
                .unwrap_err();
            assert!(
                matches!(err, OfferpassError::InvalidTransition { .. }),
                "{state} should reject prove"
            );
        }
    }

    #[test]
    fn prove_rejected_past_expiry() {
        let err = evaluate(
            EntitlementState::Active,
            LifecycleEvent::Prove,
            &ctx_at("2025-06-01T20:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, OfferpassError::EntitlementExpired));
    }

    #[test]
    fn validate_moves_to_pending() {
        let result = evaluate(
            EntitlementState::Active,
            LifecycleEvent::Validate,
            &ctx_at("2025-06-01T06:00:00Z"),
        );
        assert_eq!(
            result.unwrap(),
            Transition::To(EntitlementState::PendingConfirmation)
        );
    }

    #[test]
    fn validate_replay_rejected() {
        let err = evaluate(
            EntitlementState::PendingConfirmation,
            LifecycleEvent::Validate,
            &ctx_at("2025-06-01T06:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, OfferpassError::InvalidTransition { .. }));
    }

    #[test]
    fn confirm_only_from_pending() {
        let ok = evaluate(
            EntitlementState::PendingConfirmation,
            LifecycleEvent::Confirm,
            &ctx_at("2025-06-01T06:00:00Z"),
        );
        assert_eq!(ok.unwrap(), Transition::To(EntitlementState::Used));

        let err = evaluate(
            EntitlementState::Used,
            LifecycleEvent::Confirm,
            &ctx_at("2025-06-01T06:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, OfferpassError::InvalidTransition { .. }));
    }

    #[test]
    fn cancel_validation_restores_active() {
        let result = evaluate(
            EntitlementState::PendingConfirmation,
            LifecycleEvent::CancelValidation,
            &ctx_at("2025-06-01T06:00:00Z"),
        );
        assert_eq!(result.unwrap(), Transition::To(EntitlementState::Active));
    }

    #[test]
    fn void_within_window_same_day() {
        let mut ctx = ctx_at("2025-06-01T08:00:00Z");
        ctx.used_at = Some(utc("2025-06-01T07:00:00Z"));
        let result = evaluate(EntitlementState::Used, LifecycleEvent::Void, &ctx);
        assert_eq!(result.unwrap(), Transition::To(EntitlementState::Voided));
    }

    #[test]
    fn void_boundary_exact_window_allowed() {
        let mut ctx = ctx_at("2025-06-01T09:00:00Z");
        ctx.used_at = Some(utc("2025-06-01T07:00:00Z"));
        assert!(evaluate(EntitlementState::Used, LifecycleEvent::Void, &ctx).is_ok());

        // One microsecond past the window.
        ctx.now = utc("2025-06-01T09:00:00.000001Z");
        let err = evaluate(EntitlementState::Used, LifecycleEvent::Void, &ctx).unwrap_err();
        assert!(matches!(err, OfferpassError::VoidWindowClosed { window_hours: 2 }));
    }

    #[test]
    fn void_rejected_across_local_midnight() {
        // Used at 23:30 local (19:30 UTC); void attempt 00:30 local next day,
        // still inside the 2h window but a different calendar day.
        let mut ctx = ctx_at("2025-06-01T20:30:00Z");
        ctx.used_at = Some(utc("2025-06-01T19:30:00Z"));
        let err = evaluate(EntitlementState::Used, LifecycleEvent::Void, &ctx).unwrap_err();
        assert!(matches!(err, OfferpassError::VoidWindowClosed { .. }));
    }

    #[test]
    fn void_rejected_from_non_used() {
        for state in [
            EntitlementState::Active,
            EntitlementState::PendingConfirmation,
            EntitlementState::Voided,
            EntitlementState::Expired,
        ] {
            let mut ctx = ctx_at("2025-06-01T08:00:00Z");
            ctx.used_at = Some(utc("2025-06-01T07:00:00Z"));
            let err = evaluate(state, LifecycleEvent::Void, &ctx).unwrap_err();
            assert!(
                matches!(err, OfferpassError::InvalidTransition { .. }),
                "{state} should reject void"
            );
        }
    }

    #[test]
    fn sweep_requires_open_state_past_expiry() {
        // Past expiry, ACTIVE and PENDING sweep; terminal and USED do not.
        let ctx = ctx_at("2025-06-01T20:00:00Z");
        for state in [
            EntitlementState::Active,
            EntitlementState::PendingConfirmation,
        ] {
            assert_eq!(
                evaluate(state, LifecycleEvent::Sweep, &ctx).unwrap(),
                Transition::To(EntitlementState::Expired)
            );
        }
        for state in [
            EntitlementState::Used,
            EntitlementState::Voided,
            EntitlementState::Expired,
        ] {
            assert!(evaluate(state, LifecycleEvent::Sweep, &ctx).is_err());
        }

        // Not yet expired: nothing sweeps.
        let early = ctx_at("2025-06-01T06:00:00Z");
        assert!(evaluate(EntitlementState::Active, LifecycleEvent::Sweep, &early).is_err());
    }

    #[test]
    fn terminal_states_accept_no_event() {
        let ctx = ctx_at("2025-06-01T06:00:00Z");
        for state in [EntitlementState::Voided, EntitlementState::Expired] {
            for event in [
                LifecycleEvent::Prove,
                LifecycleEvent::Validate,
                LifecycleEvent::Confirm,
                LifecycleEvent::CancelValidation,
                LifecycleEvent::Void,
                LifecycleEvent::Sweep,
            ] {
                assert!(
                    evaluate(state, event, &ctx).is_err(),
                    "{state} must reject {}",
                    event.as_str()
                );
            }
        }
    }
}
