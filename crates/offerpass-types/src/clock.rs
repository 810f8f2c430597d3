//! Time source and local-day arithmetic.
//!
//! Every TTL, void-window check, and daily boundary flows from a single
//! [`Clock`] so tests can freeze time. Calendar math runs in one configured
//! IANA zone — all offers and windows are interpreted there.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Substitutable wall-clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen, manually advanced clock for tests.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug)]
pub struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(any(test, feature = "test-helpers"))]
impl ManualClock {
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(start))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.0.lock().expect("clock lock poisoned") = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.0.lock().expect("clock lock poisoned");
        *guard += by;
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock poisoned")
    }
}

// ---------------------------------------------------------------------------
// Local-day arithmetic
// ---------------------------------------------------------------------------

/// The local calendar date of `now` in `tz`.
#[must_use]
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// The local weekday of `now` in `tz`.
#[must_use]
pub fn local_weekday(now: DateTime<Utc>, tz: Tz) -> Weekday {
    use chrono::Datelike;
    now.with_timezone(&tz).weekday()
}

/// The local wall-clock time of `now` in `tz`.
#[must_use]
pub fn local_time(now: DateTime<Utc>, tz: Tz) -> chrono::NaiveTime {
    now.with_timezone(&tz).time()
}

/// End of the local calendar day containing `now`: 23:59:59 local, as UTC.
///
/// Entitlement expiry snaps here regardless of how close to midnight the
/// claim lands.
#[must_use]
pub fn end_of_local_day(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let eod = local_date(now, tz)
        .and_hms_opt(23, 59, 59)
        .expect("23:59:59 is a valid wall-clock time");
    tz.from_local_datetime(&eod)
        .earliest()
        .map_or(now, |dt| dt.with_timezone(&Utc))
}

/// Whole seconds from `now` until the next local midnight in `tz`.
///
/// Used as the TTL for daily-claim markers; never returns less than 1.
#[must_use]
pub fn seconds_until_local_midnight(now: DateTime<Utc>, tz: Tz) -> i64 {
    let next_midnight = (local_date(now, tz) + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid wall-clock time");
    tz.from_local_datetime(&next_midnight)
        .earliest()
        .map_or(1, |dt| {
            (dt.with_timezone(&Utc) - now).num_seconds().max(1)
        })
}

/// Whether two instants fall on the same local calendar day in `tz`.
#[must_use]
pub fn same_local_day(a: DateTime<Utc>, b: DateTime<Utc>, tz: Tz) -> bool {
    local_date(a, tz) == local_date(b, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Dubai;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_is_frozen() {
        let start = utc("2025-06-01T10:00:00Z");
        let clock = ManualClock::starting_at(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now(), start + Duration::seconds(30));
    }

    #[test]
    fn local_date_respects_zone() {
        // 22:00 UTC is 02:00 next day in Dubai (UTC+4).
        let now = utc("2025-06-01T22:00:00Z");
        assert_eq!(
            local_date(now, Dubai),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
    }

    #[test]
    fn end_of_day_snaps_to_local_2359() {
        // Claim at 23:59:58 local (19:59:58 UTC): expiry is one second later,
        // still the same local day.
        let now = utc("2025-06-01T19:59:58Z");
        let eod = end_of_local_day(now, Dubai);
        assert_eq!(eod, utc("2025-06-01T19:59:59Z"));
        assert!(same_local_day(now, eod, Dubai));
    }

    #[test]
    fn seconds_until_midnight_boundaries() {
        // 00:00:00 local exactly -> a full day remains.
        let midnight_local = utc("2025-05-31T20:00:00Z");
        assert_eq!(seconds_until_local_midnight(midnight_local, Dubai), 86_400);

        // One second before local midnight.
        let near = utc("2025-06-01T19:59:59Z");
        assert_eq!(seconds_until_local_midnight(near, Dubai), 1);
    }

    #[test]
    fn same_local_day_across_utc_midnight() {
        // 21:00 UTC and 23:00 UTC straddle nothing in Dubai: both are the
        // next local day's 01:00 and 03:00.
        let a = utc("2025-06-01T21:00:00Z");
        let b = utc("2025-06-01T23:00:00Z");
        assert!(same_local_day(a, b, Dubai));

        // 19:00 UTC (23:00 local) vs 21:00 UTC (01:00 local next day).
        let c = utc("2025-06-01T19:00:00Z");
        assert!(!same_local_day(c, a, Dubai));
    }
}
