//! Money helpers over fixed-point decimals.
//!
//! All bill and savings arithmetic runs on [`rust_decimal::Decimal`] with
//! exactly two fractional digits. Inputs with more precision are rejected at
//! the edge; percentage rounding uses banker's rounding (half to even).

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{OfferpassError, Result, constants::MONEY_SCALE};

/// Whether the value carries at most [`MONEY_SCALE`] fractional digits.
///
/// Trailing zeros do not count: `50.000` is an acceptable `50.00`.
#[must_use]
pub fn has_money_scale(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

/// Validate a monetary amount: finite scale and non-negative.
///
/// # Errors
/// Returns `InvalidAmount` naming `field` when the scale exceeds two
/// fractional digits or the value is negative.
pub fn ensure_money(value: Decimal, field: &str) -> Result<Decimal> {
    if !has_money_scale(value) {
        return Err(OfferpassError::InvalidAmount {
            reason: format!("{field} must have at most {MONEY_SCALE} fractional digits"),
        });
    }
    if value.is_sign_negative() {
        return Err(OfferpassError::InvalidAmount {
            reason: format!("{field} must not be negative"),
        });
    }
    Ok(value.round_dp(MONEY_SCALE))
}

/// Validate a strictly positive monetary amount (e.g. a bill total).
///
/// # Errors
/// Returns `InvalidAmount` when the value is zero, negative, or too precise.
pub fn ensure_positive_money(value: Decimal, field: &str) -> Result<Decimal> {
    let value = ensure_money(value, field)?;
    if value.is_zero() {
        return Err(OfferpassError::InvalidAmount {
            reason: format!("{field} must be positive"),
        });
    }
    Ok(value)
}

/// Round to two fractional digits, half to even.
#[must_use]
pub fn round_half_even(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Parse a percentage out of a free-form discount value.
///
/// Accepts `"20%"` and `"20"` (both 20); anything non-numeric or outside
/// `0 < p <= 100` is rejected.
///
/// # Errors
/// Returns `BadDiscountValue` carrying the raw input.
pub fn parse_percentage(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    let bad = || OfferpassError::BadDiscountValue {
        value: raw.to_string(),
    };
    let pct: Decimal = trimmed.parse().map_err(|_| bad())?;
    if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(bad());
    }
    Ok(pct)
}
