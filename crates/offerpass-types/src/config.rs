//! Configuration for the redemption core.
//!
//! Built once at startup into an explicit struct and passed down — never a
//! process-wide settings blob. Every field has a default from
//! [`crate::constants`].

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunables for the redemption core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionConfig {
    /// Hours after `used_at` during which a void is accepted.
    pub void_window_hours: i64,
    /// Proof-token TTL in seconds.
    pub qr_token_ttl_seconds: i64,
    /// Random bytes per proof token (>= 24 recommended).
    pub qr_token_entropy_bytes: usize,
    /// Entitlements per (user, offer, local day).
    pub max_daily_claims_per_offer: u32,
    /// Velocity gate: requests per rolling window.
    pub velocity_limit: u32,
    /// Velocity gate: window length in seconds.
    pub velocity_window_secs: i64,
    /// Requests per caller per calendar day.
    pub daily_request_limit: u32,
    /// The IANA zone all daily boundaries are computed in.
    pub local_timezone: Tz,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            void_window_hours: constants::DEFAULT_VOID_WINDOW_HOURS,
            qr_token_ttl_seconds: constants::DEFAULT_QR_TOKEN_TTL_SECONDS,
            qr_token_entropy_bytes: constants::DEFAULT_QR_TOKEN_ENTROPY_BYTES,
            max_daily_claims_per_offer: constants::DEFAULT_MAX_DAILY_CLAIMS_PER_OFFER,
            velocity_limit: constants::DEFAULT_VELOCITY_LIMIT,
            velocity_window_secs: constants::DEFAULT_VELOCITY_WINDOW_SECS,
            daily_request_limit: constants::DEFAULT_DAILY_REQUEST_LIMIT,
            local_timezone: constants::DEFAULT_LOCAL_TIMEZONE,
        }
    }
}

impl RedemptionConfig {
    /// The void window as a duration.
    #[must_use]
    pub fn void_window(&self) -> Duration {
        Duration::hours(self.void_window_hours)
    }

    /// The proof-token TTL as a duration.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.qr_token_ttl_seconds)
    }

    /// The velocity window as a duration.
    #[must_use]
    pub fn velocity_window(&self) -> Duration {
        Duration::seconds(self.velocity_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = RedemptionConfig::default();
        assert_eq!(cfg.void_window_hours, 2);
        assert_eq!(cfg.qr_token_ttl_seconds, 30);
        assert_eq!(cfg.qr_token_entropy_bytes, 24);
        assert_eq!(cfg.max_daily_claims_per_offer, 1);
        assert_eq!(cfg.velocity_limit, 10);
        assert_eq!(cfg.velocity_window_secs, 60);
        assert_eq!(cfg.daily_request_limit, 150);
        assert_eq!(cfg.local_timezone, chrono_tz::Asia::Dubai);
    }

    #[test]
    fn durations() {
        let cfg = RedemptionConfig::default();
        assert_eq!(cfg.void_window(), Duration::hours(2));
        assert_eq!(cfg.token_ttl(), Duration::seconds(30));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = RedemptionConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RedemptionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.local_timezone, cfg.local_timezone);
        assert_eq!(back.daily_request_limit, cfg.daily_request_limit);
    }
}
