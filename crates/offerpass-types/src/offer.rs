//! Catalog offer model.
//!
//! Offers are authored outside the core and are read-only here except for
//! the best-effort `total_claims` counter. Eligibility is a set of small
//! predicates composed by the redemption service at claim time.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CategoryId, MerchantId, OfferId, OfferpassError, Result, money};

/// Closed set of offer kinds. The catalog stores these as strings;
/// conversion happens only at the persistence and transport edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferType {
    /// Percentage off the bill; the rate lives in `discount_value` ("20%").
    Percentage,
    /// Buy-one-get-one: the free item's price is the `original_price` snapshot.
    Bogo,
    /// Fixed-price bundle: pay `discounted_price` instead of `original_price`.
    Bundle,
}

impl OfferType {
    /// Canonical wire/persistence form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "PERCENTAGE",
            Self::Bogo => "BOGO",
            Self::Bundle => "BUNDLE",
        }
    }

    /// Parse the canonical wire form.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for unknown kinds.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "PERCENTAGE" => Ok(Self::Percentage),
            "BOGO" => Ok(Self::Bogo),
            "BUNDLE" => Ok(Self::Bundle),
            other => Err(OfferpassError::InvalidRequest {
                reason: format!("unknown offer type {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for OfferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog offer as the core sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub merchant_id: MerchantId,
    pub category_id: Option<CategoryId>,
    /// Student-facing title, surfaced on validation and entitlement lists.
    pub title: String,
    pub offer_type: OfferType,
    /// Free-form discount descriptor. For PERCENTAGE offers this must parse
    /// as a rate ("20%" or "20"); other kinds use it for display only.
    pub discount_value: String,
    /// Price snapshot: the undiscounted reference price. For BOGO this is
    /// the free item's price; for BUNDLE the pre-bundle total.
    pub original_price: Decimal,
    /// Price snapshot: the bundle price. Only meaningful for BUNDLE.
    pub discounted_price: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// Optional daily time window (local wall-clock), inclusive.
    pub time_from: Option<NaiveTime>,
    pub time_until: Option<NaiveTime>,
    /// Optional weekday restriction; `None` means every day.
    pub valid_days: Option<Vec<Weekday>>,
    pub is_active: bool,
    /// Optional cap across all users.
    pub max_total_claims: Option<u32>,
    /// Monotonic counter, incremented best-effort on claim. The entitlements
    /// table is the ground truth.
    pub total_claims: u32,
    pub is_featured: bool,
}

impl Offer {
    /// The percentage rate for PERCENTAGE offers, parsed from `discount_value`.
    ///
    /// # Errors
    /// Returns `BadDiscountValue` when the descriptor is not a usable rate.
    pub fn percentage(&self) -> Result<Decimal> {
        money::parse_percentage(&self.discount_value)
    }

    /// Whether `now` falls inside the offer's absolute validity range.
    #[must_use]
    pub fn is_within_validity(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now <= self.valid_until
    }

    /// Whether the local wall-clock time falls inside the daily window.
    /// Offers without a window are valid all day.
    #[must_use]
    pub fn is_within_daily_window(&self, local_time: NaiveTime) -> bool {
        match (self.time_from, self.time_until) {
            (Some(from), Some(until)) => from <= local_time && local_time <= until,
            _ => true,
        }
    }

    /// Whether the offer runs on the given weekday.
    #[must_use]
    pub fn is_valid_on(&self, weekday: Weekday) -> bool {
        self.valid_days
            .as_ref()
            .is_none_or(|days| days.contains(&weekday))
    }

    /// Whether the total claim cap still has room.
    #[must_use]
    pub fn has_claim_capacity(&self) -> bool {
        self.max_total_claims
            .is_none_or(|cap| self.total_claims < cap)
    }
}

/// Dummy offers for tests.
#[cfg(any(test, feature = "test-helpers"))]
impl Offer {
    fn dummy_base(offer_type: OfferType, discount_value: &str) -> Self {
        // A wide fixed window so frozen-clock tests land inside it.
        let valid_from = chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .expect("valid RFC 3339 timestamp")
            .with_timezone(&Utc);
        let valid_until = chrono::DateTime::parse_from_rfc3339("2035-12-31T23:59:59Z")
            .expect("valid RFC 3339 timestamp")
            .with_timezone(&Utc);
        Self {
            id: OfferId::new(),
            merchant_id: MerchantId::new(),
            category_id: None,
            title: "Test offer".to_string(),
            offer_type,
            discount_value: discount_value.to_string(),
            original_price: Decimal::ZERO,
            discounted_price: Decimal::ZERO,
            valid_from,
            valid_until,
            time_from: None,
            time_until: None,
            valid_days: None,
            is_active: true,
            max_total_claims: None,
            total_claims: 0,
            is_featured: false,
        }
    }

    /// Active percentage offer, e.g. `dummy_percentage("20%")`.
    pub fn dummy_percentage(discount_value: &str) -> Self {
        Self::dummy_base(OfferType::Percentage, discount_value)
    }

    /// Active BOGO offer with the given free-item price.
    pub fn dummy_bogo(item_price: Decimal) -> Self {
        let mut offer = Self::dummy_base(OfferType::Bogo, "Buy 1 Get 1");
        offer.original_price = item_price;
        offer
    }

    /// Active bundle offer: pay `bundle` instead of `original`.
    pub fn dummy_bundle(original: Decimal, bundle: Decimal) -> Self {
        let mut offer = Self::dummy_base(OfferType::Bundle, "Bundle deal");
        offer.original_price = original;
        offer.discounted_price = bundle;
        offer
    }
}
