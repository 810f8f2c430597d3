//! Redemption — the recorded event of an entitlement being accepted.
//!
//! Redemption rows are append-only except for the void fields. Money values
//! always carry exactly two fractional digits, and
//! `final_amount + discount_amount == total_bill` holds for every row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EntitlementId, MerchantId, OfferId, OfferType, RedemptionId, UserId};

/// A confirmed redemption with captured bill and savings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RedemptionId,
    /// 1:1 with the USED entitlement; survives voiding with `is_voided`.
    pub entitlement_id: EntitlementId,
    pub merchant_id: MerchantId,
    pub offer_id: OfferId,
    pub user_id: UserId,
    /// Bill before discount.
    pub total_bill: Decimal,
    /// Savings granted to the student.
    pub discount_amount: Decimal,
    /// What the student actually paid: `total_bill - discount_amount`, exact.
    pub final_amount: Decimal,
    /// Offer kind snapshot at confirmation time.
    pub offer_type: OfferType,
    pub redeemed_at: DateTime<Utc>,
    pub is_voided: bool,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl Redemption {
    /// Build a fresh (non-voided) redemption row.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn record(
        entitlement_id: EntitlementId,
        merchant_id: MerchantId,
        offer_id: OfferId,
        user_id: UserId,
        total_bill: Decimal,
        discount_amount: Decimal,
        final_amount: Decimal,
        offer_type: OfferType,
        redeemed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RedemptionId::new(),
            entitlement_id,
            merchant_id,
            offer_id,
            user_id,
            total_bill,
            discount_amount,
            final_amount,
            offer_type,
            redeemed_at,
            is_voided: false,
            voided_at: None,
            void_reason: None,
        }
    }

    /// The closing-the-books identity for this row.
    #[must_use]
    pub fn conserves_bill(&self) -> bool {
        self.final_amount + self.discount_amount == self.total_bill
    }

    /// Flip the void fields. State-machine and window checks happen before
    /// this is called.
    pub fn mark_voided(&mut self, voided_at: DateTime<Utc>, reason: impl Into<String>) {
        self.is_voided = true;
        self.voided_at = Some(voided_at);
        self.void_reason = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn make_redemption() -> Redemption {
        Redemption::record(
            EntitlementId::new(),
            MerchantId::new(),
            OfferId::new(),
            UserId::new(),
            dec("50.00"),
            dec("10.00"),
            dec("40.00"),
            OfferType::Percentage,
            Utc::now(),
        )
    }

    #[test]
    fn fresh_row_is_not_voided() {
        let r = make_redemption();
        assert!(!r.is_voided);
        assert!(r.voided_at.is_none());
        assert!(r.void_reason.is_none());
    }

    #[test]
    fn conserves_bill_exactly() {
        let r = make_redemption();
        assert!(r.conserves_bill());

        let mut broken = make_redemption();
        broken.discount_amount = dec("10.01");
        assert!(!broken.conserves_bill());
    }

    #[test]
    fn mark_voided_sets_all_fields() {
        let mut r = make_redemption();
        let now = Utc::now();
        r.mark_voided(now, "customer changed order, refunded via card");
        assert!(r.is_voided);
        assert_eq!(r.voided_at, Some(now));
        assert!(r.void_reason.as_deref().unwrap().contains("refunded"));
        // Captured amounts are untouched by voiding.
        assert!(r.conserves_bill());
    }

    #[test]
    fn serde_roundtrip() {
        let r = make_redemption();
        let json = serde_json::to_string(&r).unwrap();
        let back: Redemption = serde_json::from_str(&json).unwrap();
        assert_eq!(r.id, back.id);
        assert_eq!(r.total_bill, back.total_bill);
        assert_eq!(r.offer_type, back.offer_type);
    }
}
