//! # offerpass-gateway
//!
//! **Gate plane**: the ephemeral TTL store and everything that rides on it —
//! rate limiting, the daily-claim fast path, and proof-token brokering.
//!
//! ## Architecture
//!
//! The gate sits between the entry points and the redemption service:
//! 1. **KvStore**: absolute-expiry key-value entries, atomic single-use consume
//! 2. **RateLimiter**: velocity + daily quota per caller — **fails open**
//! 3. **DailyClaimLedger**: per-(user, offer, day) marker fast path; the
//!    store's unique index is the ground truth
//! 4. **TokenBroker**: mints and consumes 30 s single-use proof tokens —
//!    **fails closed**
//!
//! ## Claim Flow
//!
//! ```text
//! Entry -> RateLimiter.check() -> DailyClaimLedger.already_claimed()
//!       -> Store insert (unique index) -> DailyClaimLedger.mark_claimed()
//! ```
//!
//! The fail-open/fail-closed split is deliberate policy per component, not
//! an accident of error paths.

pub mod daily_ledger;
pub mod kv;
pub mod rate_limiter;
pub mod token_broker;

pub use daily_ledger::DailyClaimLedger;
pub use kv::KvStore;
pub use rate_limiter::RateLimiter;
pub use token_broker::{IssuedToken, TokenBroker, TokenRecord};
