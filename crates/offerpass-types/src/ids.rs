//! Globally unique identifiers used throughout OfferPass.
//!
//! All entity IDs use UUIDv7 for time-ordered lexicographic sorting.
//! `DeviceId` is an opaque client-supplied string, and `ProofToken` is the
//! opaque bearer secret displayed as a QR code — its raw value never appears
//! in logs, only a SHA-256 fingerprint prefix.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if $prefix.is_empty() {
                    write!(f, "{}", self.0)
                } else {
                    write!(f, "{}:{}", $prefix, self.0)
                }
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an entitlement (the per-user, per-offer ticket).
    EntitlementId,
    ""
);
uuid_id!(
    /// Unique identifier for a catalog offer. Offers are authored elsewhere;
    /// the core only reads them.
    OfferId,
    ""
);
uuid_id!(
    /// Unique identifier for a user. Issued by the identity collaborator;
    /// opaque to the core.
    UserId,
    ""
);
uuid_id!(
    /// Unique identifier for a merchant.
    MerchantId,
    ""
);
uuid_id!(
    /// Unique identifier for an offer category.
    CategoryId,
    ""
);
uuid_id!(
    /// Unique identifier for a recorded redemption event.
    RedemptionId,
    "rdm"
);
uuid_id!(
    /// Unique identifier for an analytics event row.
    EventId,
    "evt"
);
uuid_id!(
    /// Caller-supplied idempotency key for safe retries of mutating requests.
    RequestId,
    "req"
);

impl EntitlementId {
    /// Extract the embedded timestamp (milliseconds since UNIX epoch) from UUIDv7.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        u64::from_be_bytes([
            0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        ])
    }
}

// ---------------------------------------------------------------------------
// DeviceId
// ---------------------------------------------------------------------------

/// Opaque device identifier supplied by the student app at claim time.
///
/// Used for optional device binding: when both the entitlement and the
/// validating terminal carry a device id, they must agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ProofToken
// ---------------------------------------------------------------------------

/// The opaque single-use bearer secret behind a QR display.
///
/// Security rests on entropy, the 30 s TTL, and atomic single-use
/// consumption — not on any signature. `Debug` and `Display` render only a
/// fingerprint so the raw secret cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofToken(String);

impl ProofToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw secret, for KV key construction and wire responses only.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short SHA-256 fingerprint, safe for logs and audit trails.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for ProofToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofToken(tok:{})", self.fingerprint())
    }
}

impl fmt::Display for ProofToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tok:{}", self.fingerprint())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
