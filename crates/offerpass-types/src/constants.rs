//! System-wide constants for the OfferPass redemption core.

/// Fractional digits carried by every money value.
pub const MONEY_SCALE: u32 = 2;

/// Hours after `used_at` during which a redemption may be voided
/// (the same-local-day rule also applies).
pub const DEFAULT_VOID_WINDOW_HOURS: i64 = 2;

/// Proof-token lifetime. The QR display refreshes faster than this.
pub const DEFAULT_QR_TOKEN_TTL_SECONDS: i64 = 30;

/// Random bytes behind each proof token (24 bytes = 192 bits).
pub const DEFAULT_QR_TOKEN_ENTROPY_BYTES: usize = 24;

/// Entitlements a user may hold per offer per local calendar day.
pub const DEFAULT_MAX_DAILY_CLAIMS_PER_OFFER: u32 = 1;

/// Velocity gate: requests allowed per rolling window.
pub const DEFAULT_VELOCITY_LIMIT: u32 = 10;

/// Velocity gate: rolling window length in seconds.
pub const DEFAULT_VELOCITY_WINDOW_SECS: i64 = 60;

/// Daily request quota per caller.
pub const DEFAULT_DAILY_REQUEST_LIMIT: u32 = 150;

/// Seconds in the daily quota window.
pub const DAILY_WINDOW_SECS: i64 = 86_400;

/// The single IANA zone all daily boundaries are computed in.
pub const DEFAULT_LOCAL_TIMEZONE: chrono_tz::Tz = chrono_tz::Asia::Dubai;

// ---------------------------------------------------------------------------
// KV key layout (stable; other services may share the namespace)
// ---------------------------------------------------------------------------

/// `redeem:token:<opaque>` -> JSON token record, TTL 30 s.
pub const KV_PREFIX_QR_TOKEN: &str = "redeem:token:";

/// `claim:daily:<user>:<offer>:<YYYY-MM-DD>` -> "1", TTL until local midnight.
pub const KV_PREFIX_DAILY_CLAIM: &str = "claim:daily:";

/// `limit:velocity:<user>` -> counter, TTL 60 s.
pub const KV_PREFIX_VELOCITY: &str = "limit:velocity:";

/// `limit:daily:<user>:<YYYY-MM-DD>` -> counter, TTL 24 h.
pub const KV_PREFIX_DAILY_LIMIT: &str = "limit:daily:";

// ---------------------------------------------------------------------------
// Request bounds
// ---------------------------------------------------------------------------

/// Void reasons must be meaningful but bounded.
pub const MIN_VOID_REASON_LEN: usize = 10;
pub const MAX_VOID_REASON_LEN: usize = 500;

/// Sanity bounds on inbound proof tokens (hex of 16..=64 entropy bytes).
pub const MIN_PROOF_TOKEN_LEN: usize = 32;
pub const MAX_PROOF_TOKEN_LEN: usize = 128;

/// Request-replay cache size (responses remembered for idempotent retries).
pub const REQUEST_REPLAY_CACHE_SIZE: usize = 100_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OfferPass";
