//! Ephemeral key-value store with absolute-expiry semantics.
//!
//! This is the process-local stand-in for the shared cache tier. Entries
//! carry an absolute expiry; reads treat expired entries as absent. Every
//! operation takes `now` so TTL decisions flow from the single clock.
//!
//! Interior locking makes [`KvStore::get_and_delete`] a single-winner
//! consume under concurrency — two terminals racing on the same proof token
//! see exactly one value between them.
//!
//! ## Failure model
//!
//! An availability toggle simulates infrastructure outage: while flipped
//! off, every operation returns [`OfferpassError::KvUnavailable`]. Callers
//! choose their policy — the rate limiter fails open, the token broker
//! fails closed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use offerpass_types::{OfferpassError, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct KvInner {
    entries: HashMap<String, Entry>,
    available: bool,
}

/// In-memory TTL store shared across the gate components.
#[derive(Debug)]
pub struct KvStore {
    inner: Mutex<KvInner>,
}

impl KvStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(KvInner {
                entries: HashMap::new(),
                available: true,
            }),
        }
    }

    /// Flip availability. While off, every call reports `KvUnavailable`.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.available = available;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, KvInner>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| OfferpassError::KvUnavailable)?;
        if !inner.available {
            return Err(OfferpassError::KvUnavailable);
        }
        Ok(inner)
    }

    fn is_live(entry: &Entry, now: DateTime<Utc>) -> bool {
        now < entry.expires_at
    }

    /// Store `value` under `key`, overwriting, expiring `ttl` from `now`.
    pub fn set_with_ttl(
        &self,
        key: &str,
        value: impl Into<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.into(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    /// Fetch the live value under `key`, if any.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .get(key)
            .filter(|entry| Self::is_live(entry, now))
            .map(|entry| entry.value.clone()))
    }

    /// Remove `key`. Returns whether a live entry existed.
    pub fn delete(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.lock()?;
        match inner.entries.remove(key) {
            Some(entry) => Ok(Self::is_live(&entry, now)),
            None => Ok(false),
        }
    }

    /// Atomic single-use consume: fetch and remove in one step.
    ///
    /// Concurrent callers racing on the same key get at most one `Some`.
    pub fn get_and_delete(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let mut inner = self.lock()?;
        Ok(inner
            .entries
            .remove(key)
            .filter(|entry| Self::is_live(entry, now))
            .map(|entry| entry.value))
    }

    /// Increment the counter under `key`. The first increment sets the TTL;
    /// later increments leave the expiry untouched.
    pub fn incr_with_ttl(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Result<i64> {
        let mut inner = self.lock()?;
        if let Some(entry) = inner.entries.get_mut(key) {
            if Self::is_live(entry, now) {
                // Non-numeric residue restarts the counter rather than
                // poisoning the key forever.
                let count = entry.value.parse::<i64>().unwrap_or(0) + 1;
                entry.value = count.to_string();
                return Ok(count);
            }
        }
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: "1".to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(1)
    }

    /// Absolute expiry of the live entry under `key`, if any.
    pub fn expires_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .get(key)
            .filter(|entry| Self::is_live(entry, now))
            .map(|entry| entry.expires_at))
    }

    /// Number of live entries (expired ones are invisible).
    pub fn live_len(&self, now: DateTime<Utc>) -> Result<usize> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .values()
            .filter(|entry| Self::is_live(entry, now))
            .count())
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}
