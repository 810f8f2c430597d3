//! Rate limiter — velocity and daily-quota gate in front of the core.
//!
//! Two windows keyed by the verified caller identity:
//!
//! - **Velocity**: at most N requests per rolling window (spam protection)
//! - **Daily**: at most D requests per local calendar day (cost control)
//!
//! Both ride on [`KvStore::incr_with_ttl`]. **Fail-open**: if the KV tier is
//! unavailable the limiter logs and lets the request through — an outage in
//! the cache must never lock students out of claiming.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use offerpass_types::{
    OfferpassError, RedemptionConfig, Result, UserId,
    clock::{local_date, seconds_until_local_midnight},
    constants::{DAILY_WINDOW_SECS, KV_PREFIX_DAILY_LIMIT, KV_PREFIX_VELOCITY},
};

use crate::kv::KvStore;

/// Velocity + daily-quota gate.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    velocity_limit: u32,
    velocity_window: chrono::Duration,
    daily_limit: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn from_config(config: &RedemptionConfig) -> Self {
        Self {
            velocity_limit: config.velocity_limit,
            velocity_window: config.velocity_window(),
            daily_limit: config.daily_request_limit,
        }
    }

    /// Custom limits, for caller classes with overridden quotas.
    #[must_use]
    pub fn with_limits(
        velocity_limit: u32,
        velocity_window: chrono::Duration,
        daily_limit: u32,
    ) -> Self {
        Self {
            velocity_limit,
            velocity_window,
            daily_limit,
        }
    }

    /// Check both windows for `user`, counting this request.
    ///
    /// # Errors
    /// `RateLimited` when either window is exceeded. KV outage is **not** an
    /// error here: the limiter fails open.
    pub fn check(&self, kv: &KvStore, user: UserId, now: DateTime<Utc>, tz: Tz) -> Result<()> {
        self.check_velocity(kv, user, now)?;
        self.check_daily(kv, user, now, tz)
    }

    fn check_velocity(&self, kv: &KvStore, user: UserId, now: DateTime<Utc>) -> Result<()> {
        let key = format!("{KV_PREFIX_VELOCITY}{user}");
        match kv.incr_with_ttl(&key, self.velocity_window, now) {
            Ok(count) if count > i64::from(self.velocity_limit) => {
                let retry_after_secs = kv
                    .expires_at(&key, now)
                    .ok()
                    .flatten()
                    .map_or(self.velocity_window.num_seconds(), |expiry| {
                        (expiry - now).num_seconds().max(1)
                    });
                tracing::warn!(user = %user, count, "velocity limit exceeded");
                Err(OfferpassError::RateLimited {
                    scope: "velocity",
                    retry_after_secs,
                })
            }
            Ok(_) => Ok(()),
            Err(OfferpassError::KvUnavailable) => {
                tracing::warn!(user = %user, "kv unavailable, velocity gate failing open");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn check_daily(&self, kv: &KvStore, user: UserId, now: DateTime<Utc>, tz: Tz) -> Result<()> {
        let key = format!("{KV_PREFIX_DAILY_LIMIT}{user}:{}", local_date(now, tz));
        match kv.incr_with_ttl(&key, chrono::Duration::seconds(DAILY_WINDOW_SECS), now) {
            Ok(count) if count > i64::from(self.daily_limit) => {
                tracing::warn!(user = %user, count, "daily quota exceeded");
                Err(OfferpassError::RateLimited {
                    scope: "daily",
                    retry_after_secs: seconds_until_local_midnight(now, tz),
                })
            }
            Ok(_) => Ok(()),
            Err(OfferpassError::KvUnavailable) => {
                tracing::warn!(user = %user, "kv unavailable, daily gate failing open");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Dubai;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn limiter(velocity: u32, daily: u32) -> RateLimiter {
        RateLimiter::with_limits(velocity, chrono::Duration::seconds(60), daily)
    }

    #[test]
    fn under_both_limits_passes() {
        let kv = KvStore::new();
        let rl = limiter(3, 10);
        let user = UserId::new();
        let now = utc("2025-06-01T10:00:00Z");
        for _ in 0..3 {
            rl.check(&kv, user, now, Dubai).unwrap();
        }
    }

    #[test]
    fn velocity_limit_trips_with_retry_hint() {
        let kv = KvStore::new();
        let rl = limiter(2, 100);
        let user = UserId::new();
        let now = utc("2025-06-01T10:00:00Z");
        rl.check(&kv, user, now, Dubai).unwrap();
        rl.check(&kv, user, now, Dubai).unwrap();

        let later = now + chrono::Duration::seconds(10);
        let err = rl.check(&kv, user, later, Dubai).unwrap_err();
        match err {
            OfferpassError::RateLimited {
                scope,
                retry_after_secs,
            } => {
                assert_eq!(scope, "velocity");
                assert_eq!(retry_after_secs, 50);
            }
            other => panic!("expected RateLimited, got {other}"),
        }
    }

    #[test]
    fn velocity_window_rolls_over() {
        let kv = KvStore::new();
        let rl = limiter(1, 100);
        let user = UserId::new();
        let now = utc("2025-06-01T10:00:00Z");
        rl.check(&kv, user, now, Dubai).unwrap();
        assert!(rl.check(&kv, user, now, Dubai).is_err());

        // Past the window the counter restarts.
        let next_window = now + chrono::Duration::seconds(61);
        rl.check(&kv, user, next_window, Dubai).unwrap();
    }

    #[test]
    fn daily_quota_trips_until_midnight() {
        let kv = KvStore::new();
        let rl = RateLimiter::with_limits(100, chrono::Duration::seconds(60), 2);
        let user = UserId::new();
        // 10:00 local Dubai.
        let now = utc("2025-06-01T06:00:00Z");
        rl.check(&kv, user, now, Dubai).unwrap();
        rl.check(&kv, user, now, Dubai).unwrap();

        let err = rl.check(&kv, user, now, Dubai).unwrap_err();
        match err {
            OfferpassError::RateLimited {
                scope,
                retry_after_secs,
            } => {
                assert_eq!(scope, "daily");
                // 14 hours until local midnight.
                assert_eq!(retry_after_secs, 14 * 3600);
            }
            other => panic!("expected RateLimited, got {other}"),
        }
    }

    #[test]
    fn daily_quota_is_per_local_day() {
        let kv = KvStore::new();
        let rl = RateLimiter::with_limits(100, chrono::Duration::seconds(60), 1);
        let user = UserId::new();
        let today = utc("2025-06-01T06:00:00Z");
        rl.check(&kv, user, today, Dubai).unwrap();
        assert!(rl.check(&kv, user, today, Dubai).is_err());

        // 20:30 UTC = next local day in Dubai: fresh key, fresh quota.
        let tomorrow_local = utc("2025-06-01T20:30:00Z");
        rl.check(&kv, user, tomorrow_local, Dubai).unwrap();
    }

    #[test]
    fn kv_outage_fails_open() {
        let kv = KvStore::new();
        let rl = limiter(1, 1);
        let user = UserId::new();
        let now = utc("2025-06-01T10:00:00Z");

        kv.set_available(false);
        // Far past any limit, but the gate lets everything through.
        for _ in 0..10 {
            rl.check(&kv, user, now, Dubai).unwrap();
        }
    }

    #[test]
    fn separate_users_have_separate_windows() {
        let kv = KvStore::new();
        let rl = limiter(1, 10);
        let now = utc("2025-06-01T10:00:00Z");
        let a = UserId::new();
        let b = UserId::new();
        rl.check(&kv, a, now, Dubai).unwrap();
        rl.check(&kv, b, now, Dubai).unwrap();
        assert!(rl.check(&kv, a, now, Dubai).is_err());
    }
}
