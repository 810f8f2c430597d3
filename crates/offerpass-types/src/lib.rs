//! # offerpass-types
//!
//! Shared types, errors, and configuration for the **OfferPass** redemption
//! core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`EntitlementId`], [`OfferId`], [`UserId`], [`MerchantId`],
//!   [`RedemptionId`], [`EventId`], [`DeviceId`], [`ProofToken`]
//! - **Entitlement model**: [`Entitlement`], [`EntitlementState`]
//! - **Catalog models**: [`Offer`], [`OfferType`], [`Merchant`], [`User`], [`UserRole`]
//! - **Redemption model**: [`Redemption`]
//! - **Analytics model**: [`AnalyticsEvent`], [`EventType`]
//! - **Money helpers**: scale-2 validation and banker's rounding in [`money`]
//! - **Time**: [`Clock`], [`SystemClock`], and local-day arithmetic in [`clock`]
//! - **Configuration**: [`RedemptionConfig`]
//! - **Errors**: [`OfferpassError`] with `OP_ERR_` prefix codes and stable
//!   status mapping
//! - **Constants**: system-wide limits, defaults, and the KV key layout

pub mod clock;
pub mod config;
pub mod constants;
pub mod entitlement;
pub mod error;
pub mod event;
pub mod ids;
pub mod merchant;
pub mod money;
pub mod offer;
pub mod redemption;
pub mod user;

// Re-export all primary types at crate root for ergonomic imports:
//   use offerpass_types::{Entitlement, EntitlementState, Offer, ...};

pub use clock::{Clock, SystemClock};
pub use config::*;
pub use entitlement::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use merchant::*;
pub use offer::*;
pub use redemption::*;
pub use user::*;

#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;

// Constants are accessed via `offerpass_types::constants::FOO` and money
// helpers via `offerpass_types::money::*` (not re-exported to avoid name
// collisions).
