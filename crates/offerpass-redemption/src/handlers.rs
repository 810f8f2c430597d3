//! Entry points — the thin adapter between the transport and the service.
//!
//! Each handler:
//! 1. takes the caller identity already verified by the external identity
//!    collaborator (`None` means verification failed) — identity is never
//!    read from a request body
//! 2. validates request shape and bounds
//! 3. calls exactly one service method
//! 4. maps typed domain errors onto stable status codes
//!
//! The validate endpoint is special: a merchant terminal only ever learns
//! PASS or FAIL with a coarse reason, never why a token really failed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use offerpass_types::{
    DeviceId, EntitlementId, EntitlementState, OfferId, OfferpassError, ProofToken, RequestId,
    Result, UserId, UserRole,
    constants::{
        MAX_PROOF_TOKEN_LEN, MAX_VOID_REASON_LEN, MIN_PROOF_TOKEN_LEN, MIN_VOID_REASON_LEN,
        REQUEST_REPLAY_CACHE_SIZE,
    },
    money,
};

use crate::request_replay::ReplayGuard;
use crate::service::{
    ClaimOutcome, ConfirmOutcome, EntitlementDetail, EntitlementListItem, RedemptionService,
    VoidOutcome,
};
use crate::store::{MerchantDaySummary, SavingsSummary};

/// Verified caller identity, produced by the identity collaborator.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: UserRole,
}

impl AuthContext {
    fn require_student(&self) -> Result<()> {
        match self.role {
            UserRole::Student | UserRole::Admin => Ok(()),
            UserRole::Merchant => Err(OfferpassError::RoleForbidden { required: "student" }),
        }
    }

    fn require_merchant(&self) -> Result<()> {
        match self.role {
            UserRole::Merchant | UserRole::Admin => Ok(()),
            UserRole::Student => Err(OfferpassError::RoleForbidden { required: "merchant" }),
        }
    }
}

fn authenticated(auth: Option<&AuthContext>) -> Result<&AuthContext> {
    auth.ok_or(OfferpassError::Unauthenticated)
}

// ---------------------------------------------------------------------------
// Request / response schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub offer_id: OfferId,
    pub device_id: Option<String>,
    /// Optional idempotency key: a replay returns the original response.
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub entitlement_id: EntitlementId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProveRequest {
    pub entitlement_id: EntitlementId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProveResponse {
    /// Raw bearer secret for the QR display. Never logged.
    pub proof_token: String,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub proof_token: String,
    /// The terminal's claimed device, for device-bound entitlements.
    pub device_id: Option<String>,
}

/// PASS or FAIL — nothing else escapes to the terminal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum ValidateResponse {
    #[serde(rename = "PASS")]
    Pass {
        entitlement_id: EntitlementId,
        offer_title: String,
        offer_type: &'static str,
        discount_value: String,
        merchant_name: String,
        student_name: String,
    },
    #[serde(rename = "FAIL")]
    Fail { reason: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmRequest {
    pub entitlement_id: EntitlementId,
    pub total_bill: Decimal,
    pub final_amount: Option<Decimal>,
    /// Optional idempotency key: a replay returns the original response.
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub redemption_id: offerpass_types::RedemptionId,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoidRequest {
    pub entitlement_id: EntitlementId,
    pub reason: String,
    /// Optional idempotency key: a replay returns the original response.
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidResponse {
    pub voided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitlementsQuery {
    pub state: Option<String>,
}

/// Stable error surface for the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

/// Map a domain error onto the transport surface.
#[must_use]
pub fn error_body(err: &OfferpassError) -> ErrorBody {
    ErrorBody {
        status: err.status_code(),
        code: err.kind().as_str(),
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// The entry-point set, owning the service.
pub struct Api {
    service: RedemptionService,
    replay: ReplayGuard,
}

impl Api {
    #[must_use]
    pub fn new(service: RedemptionService) -> Self {
        Self {
            service,
            replay: ReplayGuard::new(REQUEST_REPLAY_CACHE_SIZE),
        }
    }

    /// Run a mutating handler body under the replay guard: a request id seen
    /// before short-circuits to the remembered response.
    fn with_replay<T, F>(&mut self, request_id: Option<RequestId>, f: F) -> Result<T>
    where
        T: Serialize + serde::de::DeserializeOwned,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if let Some(id) = request_id {
            if let Some(cached) = self.replay.recall(id) {
                return Ok(cached);
            }
        }
        let response = f(self)?;
        if let Some(id) = request_id {
            self.replay.remember(id, &response);
        }
        Ok(response)
    }

    #[must_use]
    pub fn service(&self) -> &RedemptionService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut RedemptionService {
        &mut self.service
    }

    /// POST claim
    pub fn claim(&mut self, auth: Option<&AuthContext>, req: ClaimRequest) -> Result<ClaimResponse> {
        let ctx = *authenticated(auth)?;
        ctx.require_student()?;
        self.with_replay(req.request_id, move |api| {
            let device_id = req.device_id.map(DeviceId::new);
            let outcome: ClaimOutcome = api.service.claim(ctx.user_id, req.offer_id, device_id)?;
            Ok(ClaimResponse {
                entitlement_id: outcome.entitlement_id,
                expires_at: outcome.expires_at,
            })
        })
    }

    /// POST prove (entitlement_id)
    pub fn prove(&mut self, auth: Option<&AuthContext>, req: ProveRequest) -> Result<ProveResponse> {
        let ctx = authenticated(auth)?;
        ctx.require_student()?;
        let issued = self.service.prove(ctx.user_id, req.entitlement_id)?;
        Ok(ProveResponse {
            proof_token: issued.token.as_str().to_string(),
            expires_at: issued.expires_at,
            ttl_seconds: issued.ttl_seconds,
        })
    }

    /// POST validate
    pub fn validate(
        &mut self,
        auth: Option<&AuthContext>,
        req: ValidateRequest,
    ) -> Result<ValidateResponse> {
        let ctx = authenticated(auth)?;
        ctx.require_merchant()?;

        let token_len = req.proof_token.len();
        if !(MIN_PROOF_TOKEN_LEN..=MAX_PROOF_TOKEN_LEN).contains(&token_len) {
            return Err(OfferpassError::InvalidRequest {
                reason: format!("proof_token length {token_len} outside expected bounds"),
            });
        }
        let token = ProofToken::new(req.proof_token);
        let device_id = req.device_id.map(DeviceId::new);

        match self.service.validate(&token, device_id.as_ref()) {
            Ok(pass) => Ok(ValidateResponse::Pass {
                entitlement_id: pass.entitlement_id,
                offer_title: pass.offer_title,
                offer_type: pass.offer_type,
                discount_value: pass.discount_value,
                merchant_name: pass.merchant_name,
                student_name: pass.student_name,
            }),
            // Coarse on purpose: consumed, expired, unknown, and wrong-state
            // all look identical to the terminal.
            Err(OfferpassError::TokenInvalidOrExpired) => Ok(ValidateResponse::Fail {
                reason: "invalid_or_expired",
            }),
            Err(other) => Err(other),
        }
    }

    /// POST confirm
    pub fn confirm(
        &mut self,
        auth: Option<&AuthContext>,
        req: ConfirmRequest,
    ) -> Result<ConfirmResponse> {
        let ctx = authenticated(auth)?;
        ctx.require_merchant()?;

        let total_bill = money::ensure_positive_money(req.total_bill, "total_bill")?;
        let final_amount = req
            .final_amount
            .map(|amount| money::ensure_money(amount, "final_amount"))
            .transpose()?;

        self.with_replay(req.request_id, move |api| {
            let outcome: ConfirmOutcome =
                api.service.confirm(req.entitlement_id, total_bill, final_amount)?;
            Ok(ConfirmResponse {
                redemption_id: outcome.redemption_id,
                discount_amount: outcome.discount_amount,
                final_amount: outcome.final_amount,
                redeemed_at: outcome.redeemed_at,
            })
        })
    }

    /// POST void
    pub fn void(&mut self, auth: Option<&AuthContext>, req: VoidRequest) -> Result<VoidResponse> {
        let ctx = authenticated(auth)?;
        ctx.require_merchant()?;

        let reason_len = req.reason.chars().count();
        if !(MIN_VOID_REASON_LEN..=MAX_VOID_REASON_LEN).contains(&reason_len) {
            return Err(OfferpassError::InvalidRequest {
                reason: format!(
                    "reason must be {MIN_VOID_REASON_LEN}..={MAX_VOID_REASON_LEN} chars, got {reason_len}"
                ),
            });
        }

        self.with_replay(req.request_id, move |api| {
            let outcome: VoidOutcome = api.service.void(req.entitlement_id, &req.reason)?;
            Ok(VoidResponse {
                voided_at: outcome.voided_at,
            })
        })
    }

    /// POST cancel-validation
    pub fn cancel_validation(
        &mut self,
        auth: Option<&AuthContext>,
        req: ProveRequest,
    ) -> Result<()> {
        let ctx = authenticated(auth)?;
        ctx.require_merchant()?;
        self.service.cancel_validation(req.entitlement_id)
    }

    /// GET entitlements?state=...
    pub fn entitlements(
        &self,
        auth: Option<&AuthContext>,
        query: EntitlementsQuery,
    ) -> Result<Vec<EntitlementListItem>> {
        let ctx = authenticated(auth)?;
        ctx.require_student()?;
        let state = query
            .state
            .as_deref()
            .map(EntitlementState::parse)
            .transpose()?;
        Ok(self.service.entitlements_for(ctx.user_id, state))
    }

    /// GET entitlements/{id}
    pub fn entitlement_detail(
        &self,
        auth: Option<&AuthContext>,
        entitlement_id: EntitlementId,
    ) -> Result<EntitlementDetail> {
        let ctx = authenticated(auth)?;
        ctx.require_student()?;
        self.service.entitlement_detail(ctx.user_id, entitlement_id)
    }

    /// GET savings
    pub fn savings(&self, auth: Option<&AuthContext>) -> Result<SavingsSummary> {
        let ctx = authenticated(auth)?;
        ctx.require_student()?;
        Ok(self.service.savings_summary(ctx.user_id))
    }

    /// GET merchant summary for one local day.
    pub fn merchant_summary(
        &self,
        auth: Option<&AuthContext>,
        merchant_id: offerpass_types::MerchantId,
        day: NaiveDate,
    ) -> Result<MerchantDaySummary> {
        let ctx = authenticated(auth)?;
        ctx.require_merchant()?;
        Ok(self.service.merchant_day_summary(merchant_id, day))
    }
}
