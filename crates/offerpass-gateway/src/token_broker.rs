//! Proof-token broker — mints and consumes the QR bearer secrets.
//!
//! A proof token is an opaque random string (24 bytes of entropy,
//! hex-encoded and therefore URL-safe) stored server-side under
//! `redeem:token:<token>` with a 30 s TTL. There is no signature: security
//! rests on entropy, the short TTL, and the atomic single-use consume.
//!
//! **Fail-closed**: if the KV tier is unavailable, both minting and
//! consuming report the retryable transient error — a token that cannot be
//! checked is a token that does not validate.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use offerpass_types::{
    DeviceId, EntitlementId, OfferId, ProofToken, RedemptionConfig, Result, UserId,
    constants::KV_PREFIX_QR_TOKEN,
};

use crate::kv::KvStore;

/// What a token resolves to when a terminal consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub entitlement_id: EntitlementId,
    pub user_id: UserId,
    pub offer_id: OfferId,
    pub device_id: Option<DeviceId>,
    pub issued_at: DateTime<Utc>,
}

/// A freshly minted token with its absolute expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: ProofToken,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

/// Mints and single-use-consumes proof tokens in the KV tier.
#[derive(Debug, Clone)]
pub struct TokenBroker {
    ttl: chrono::Duration,
    entropy_bytes: usize,
}

impl TokenBroker {
    #[must_use]
    pub fn from_config(config: &RedemptionConfig) -> Self {
        Self {
            ttl: config.token_ttl(),
            entropy_bytes: config.qr_token_entropy_bytes,
        }
    }

    /// Mint a token for the given entitlement and store its record.
    ///
    /// # Errors
    /// Propagates `KvUnavailable` (fail-closed) and serialization failures.
    pub fn issue(
        &self,
        kv: &KvStore,
        record: TokenRecord,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let mut bytes = vec![0u8; self.entropy_bytes];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = ProofToken::new(hex::encode(&bytes));

        let entitlement_id = record.entitlement_id;
        let payload = serde_json::to_string(&record)?;
        let key = format!("{KV_PREFIX_QR_TOKEN}{}", token.as_str());
        kv.set_with_ttl(&key, payload, self.ttl, now)?;

        tracing::info!(%token, %entitlement_id, "proof token issued");
        Ok(IssuedToken {
            token,
            expires_at: now + self.ttl,
            ttl_seconds: self.ttl.num_seconds(),
        })
    }

    /// Atomically consume a token. `None` means unknown, expired, or already
    /// consumed — callers must not distinguish further.
    ///
    /// # Errors
    /// Propagates `KvUnavailable` (fail-closed) and record-decoding failures.
    pub fn consume(
        &self,
        kv: &KvStore,
        token: &ProofToken,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let key = format!("{KV_PREFIX_QR_TOKEN}{}", token.as_str());
        match kv.get_and_delete(&key, now)? {
            Some(payload) => {
                let record: TokenRecord = serde_json::from_str(&payload)?;
                tracing::info!(%token, entitlement_id = %record.entitlement_id, "proof token consumed");
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
