//! Error types for the OfferPass redemption core.
//!
//! All errors use the `OP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Offer eligibility errors
//! - 2xx: Entitlement / daily-quota errors
//! - 3xx: Proof-token errors
//! - 4xx: Lifecycle / state-machine errors
//! - 5xx: Amount / request-shape errors
//! - 6xx: Rate-limit errors
//! - 7xx: Identity errors
//! - 8xx: Infrastructure errors (retryable)
//! - 9xx: General / internal errors
//!
//! Every error also carries a coarse [`ErrorKind`] and a stable status code
//! so the entry-point layer can map domain failures without inspecting
//! individual variants.

use thiserror::Error;

use crate::{EntitlementId, EntitlementState, OfferId};

/// Coarse error classification with a stable transport status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller identity missing or invalid.
    Unauthenticated,
    /// Caller is authenticated but not allowed to touch this resource.
    Forbidden,
    /// Referenced entity absent.
    NotFound,
    /// Request shape or bounds failed validation.
    InvalidArgument,
    /// Per-(user, offer, day) uniqueness violated.
    DailyLimit,
    /// Velocity or daily request quota exceeded.
    RateLimited,
    /// Offer inactive, outside its window, or capped.
    IneligibleOffer,
    /// The lifecycle state machine rejected the transition.
    InvalidState,
    /// Proof token consumed, expired, or unknown.
    InvalidOrExpired,
    /// Device binding failed.
    DeviceMismatch,
    /// Void attempted outside the window or on a different day.
    VoidWindowExpired,
    /// Infrastructure timeout or outage; safe to retry.
    Transient,
    /// Unclassified internal failure.
    Internal,
}

impl ErrorKind {
    /// Stable kind code for the transport edge.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DailyLimit => "DAILY_LIMIT",
            Self::RateLimited => "RATE_LIMITED",
            Self::IneligibleOffer => "INELIGIBLE_OFFER",
            Self::InvalidState => "INVALID_STATE",
            Self::InvalidOrExpired => "INVALID_OR_EXPIRED",
            Self::DeviceMismatch => "DEVICE_MISMATCH",
            Self::VoidWindowExpired => "VOID_WINDOW_EXPIRED",
            Self::Transient => "TRANSIENT",
            Self::Internal => "INTERNAL",
        }
    }

    /// Stable status code for the transport edge.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden | Self::DeviceMismatch => 403,
            Self::NotFound => 404,
            Self::InvalidArgument => 400,
            Self::DailyLimit | Self::IneligibleOffer | Self::InvalidState | Self::VoidWindowExpired => 409,
            Self::RateLimited => 429,
            Self::InvalidOrExpired => 410,
            Self::Transient => 503,
            Self::Internal => 500,
        }
    }
}

/// Central error enum for all OfferPass operations.
#[derive(Debug, Error)]
pub enum OfferpassError {
    // =================================================================
    // Offer Eligibility Errors (1xx)
    // =================================================================
    /// The requested offer does not exist in the catalog.
    #[error("OP_ERR_100: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The offer has been deactivated by the merchant or an operator.
    #[error("OP_ERR_101: Offer is not active")]
    OfferNotActive,

    /// The wall clock is outside the offer's valid_from..valid_until range.
    #[error("OP_ERR_102: Offer is not currently valid")]
    OfferOutsideValidity,

    /// The local time of day is outside the offer's daily window.
    #[error("OP_ERR_103: Offer is not valid at this time of day")]
    OfferOutsideDailyWindow,

    /// Today is not one of the offer's valid weekdays.
    #[error("OP_ERR_104: Offer is not valid on this day of the week")]
    OfferNotValidToday,

    /// The offer has reached its total claim cap.
    #[error("OP_ERR_105: Offer claim limit reached")]
    OfferClaimCapReached,

    /// The offer's discount_value could not be parsed for its type.
    #[error("OP_ERR_106: Bad discount value on offer: {value:?}")]
    BadDiscountValue { value: String },

    // =================================================================
    // Entitlement / Daily-Quota Errors (2xx)
    // =================================================================
    /// The requested entitlement does not exist.
    #[error("OP_ERR_200: Entitlement not found: {0}")]
    EntitlementNotFound(EntitlementId),

    /// The entitlement belongs to a different user.
    #[error("OP_ERR_201: Entitlement belongs to another user")]
    NotEntitlementOwner,

    /// The per-(user, offer, day) claim quota is already spent.
    #[error("OP_ERR_202: Daily claim limit reached for this offer")]
    DailyClaimLimit,

    /// The entitlement's end-of-day expiry has passed.
    #[error("OP_ERR_203: Entitlement has expired")]
    EntitlementExpired,

    // =================================================================
    // Proof-Token Errors (3xx)
    // =================================================================
    /// The token is unknown, already consumed, or past its TTL. One coarse
    /// reason on purpose: the merchant terminal must not learn which.
    #[error("OP_ERR_300: Invalid or expired token")]
    TokenInvalidOrExpired,

    /// The entitlement is device-bound and the terminal's claimed device
    /// does not match.
    #[error("OP_ERR_301: Device mismatch")]
    DeviceMismatch,

    // =================================================================
    // Lifecycle Errors (4xx)
    // =================================================================
    /// The state machine rejected the requested transition.
    #[error("OP_ERR_400: Invalid transition: {event} not allowed from {from}")]
    InvalidTransition {
        from: EntitlementState,
        event: &'static str,
    },

    /// Void attempted past the window or on a different local calendar day.
    #[error("OP_ERR_401: Void window closed: must void within {window_hours}h on the same day")]
    VoidWindowClosed { window_hours: i64 },

    // =================================================================
    // Amount / Request-Shape Errors (5xx)
    // =================================================================
    /// A money amount failed validation (sign, scale, or consistency).
    #[error("OP_ERR_500: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A request field failed shape or bounds validation.
    #[error("OP_ERR_501: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    // =================================================================
    // Rate-Limit Errors (6xx)
    // =================================================================
    /// Velocity or daily request quota exceeded.
    #[error("OP_ERR_600: Rate limit exceeded ({scope}): retry in {retry_after_secs}s")]
    RateLimited {
        scope: &'static str,
        retry_after_secs: i64,
    },

    // =================================================================
    // Identity Errors (7xx)
    // =================================================================
    /// No verified caller identity on the request.
    #[error("OP_ERR_700: Missing or invalid caller identity")]
    Unauthenticated,

    /// The caller's role does not permit this operation.
    #[error("OP_ERR_701: Operation requires {required} role")]
    RoleForbidden { required: &'static str },

    // =================================================================
    // Infrastructure Errors (8xx)
    // =================================================================
    /// The ephemeral KV store is unreachable.
    #[error("OP_ERR_800: Key-value store unavailable")]
    KvUnavailable,

    /// The persistent store is unreachable.
    #[error("OP_ERR_801: Persistent store unavailable")]
    StoreUnavailable,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OP_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

impl OfferpassError {
    /// Coarse classification used by the entry-point layer.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OfferNotFound(_) | Self::EntitlementNotFound(_) => ErrorKind::NotFound,
            Self::OfferNotActive
            | Self::OfferOutsideValidity
            | Self::OfferOutsideDailyWindow
            | Self::OfferNotValidToday
            | Self::OfferClaimCapReached => ErrorKind::IneligibleOffer,
            Self::BadDiscountValue { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidRequest { .. } => ErrorKind::InvalidArgument,
            Self::NotEntitlementOwner | Self::RoleForbidden { .. } => ErrorKind::Forbidden,
            Self::DailyClaimLimit => ErrorKind::DailyLimit,
            Self::EntitlementExpired | Self::InvalidTransition { .. } => ErrorKind::InvalidState,
            Self::TokenInvalidOrExpired => ErrorKind::InvalidOrExpired,
            Self::DeviceMismatch => ErrorKind::DeviceMismatch,
            Self::VoidWindowClosed { .. } => ErrorKind::VoidWindowExpired,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::KvUnavailable | Self::StoreUnavailable => ErrorKind::Transient,
            Self::Internal(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Stable status code for the transport edge.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OfferpassError>;

impl From<serde_json::Error> for OfferpassError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
