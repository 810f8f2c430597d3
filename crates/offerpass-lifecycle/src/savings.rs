//! Pure savings arithmetic for bill confirmation.
//!
//! Given an offer, the captured bill, and an optional merchant-declared
//! final amount, compute `(discount, final)` such that
//! `final + discount == bill` exactly, at two fractional digits. No I/O, no
//! floats.

use rust_decimal::Decimal;

use offerpass_types::{
    Offer, OfferType, OfferpassError, Result,
    money::{ensure_money, ensure_positive_money, round_half_even},
};

/// The computed outcome of a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savings {
    /// What the student saved.
    pub discount: Decimal,
    /// What the student paid.
    pub final_amount: Decimal,
}

/// Compute the savings for a confirmed bill.
///
/// A merchant-declared `final_amount` always wins: the discount becomes the
/// difference, which must not be negative. Otherwise the offer kind decides:
///
/// - **PERCENTAGE** — rate parsed from `discount_value`, rounded half to
///   even at two digits.
/// - **BOGO** — the free item's `original_price` snapshot, clamped so the
///   final amount never drops below zero.
/// - **BUNDLE** — `original_price - discounted_price`; the bill is expected
///   to equal the bundle price, but a differing bill keeps the offer-defined
///   discount.
///
/// # Errors
/// `InvalidAmount` for bad bills (non-positive, more than two fractional
/// digits) or inconsistent amounts; `BadDiscountValue` for unparseable
/// percentage descriptors.
pub fn compute_savings(
    offer: &Offer,
    total_bill: Decimal,
    declared_final: Option<Decimal>,
) -> Result<Savings> {
    let bill = ensure_positive_money(total_bill, "total_bill")?;

    if let Some(declared) = declared_final {
        let final_amount = ensure_money(declared, "final_amount")?;
        let discount = bill - final_amount;
        if discount.is_sign_negative() {
            return Err(OfferpassError::InvalidAmount {
                reason: "final_amount exceeds total_bill".to_string(),
            });
        }
        return Ok(Savings {
            discount,
            final_amount,
        });
    }

    match offer.offer_type {
        OfferType::Percentage => {
            let rate = offer.percentage()?;
            let discount = round_half_even(bill * rate / Decimal::ONE_HUNDRED);
            Ok(Savings {
                discount,
                final_amount: bill - discount,
            })
        }
        OfferType::Bogo => {
            let item_price = ensure_money(offer.original_price, "original_price")?;
            // A bill below the free item's price clamps to a free purchase.
            let discount = item_price.min(bill);
            Ok(Savings {
                discount,
                final_amount: bill - discount,
            })
        }
        OfferType::Bundle => {
            let original = ensure_money(offer.original_price, "original_price")?;
            let bundle = ensure_money(offer.discounted_price, "discounted_price")?;
            let discount = original - bundle;
            if discount.is_sign_negative() {
                return Err(OfferpassError::InvalidAmount {
                    reason: "bundle discounted_price exceeds original_price".to_string(),
                });
            }
            let final_amount = bill - discount;
            if final_amount.is_sign_negative() {
                return Err(OfferpassError::InvalidAmount {
                    reason: "total_bill is below the bundle discount".to_string(),
                });
            }
            Ok(Savings {
                discount,
                final_amount,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn percentage_twenty_off_fifty() {
        let offer = Offer::dummy_percentage("20%");
        let savings = compute_savings(&offer, dec("50.00"), None).unwrap();
        assert_eq!(savings.discount, dec("10.00"));
        assert_eq!(savings.final_amount, dec("40.00"));
    }

    #[test]
    fn percentage_without_sign() {
        let offer = Offer::dummy_percentage("20");
        let savings = compute_savings(&offer, dec("50.00"), None).unwrap();
        assert_eq!(savings.discount, dec("10.00"));
    }

    #[test]
    fn percentage_banker_rounding() {
        // 12.5% of 10.20 = 1.275 -> rounds half-even to 1.28? No: 1.275 at
        // two digits, midpoint between 1.27 and 1.28, even neighbour is 1.28.
        let offer = Offer::dummy_percentage("12.5%");
        let savings = compute_savings(&offer, dec("10.20"), None).unwrap();
        assert_eq!(savings.discount, dec("1.28"));
        assert_eq!(savings.final_amount, dec("8.92"));

        // 2.5% of 0.50 = 0.0125, midpoint between 0.01 and 0.02 -> 0.02 wins
        // (even).
        let offer = Offer::dummy_percentage("2.5%");
        let savings = compute_savings(&offer, dec("0.50"), None).unwrap();
        assert_eq!(savings.discount, dec("0.02"));
    }

    #[test]
    fn percentage_garbage_descriptor_rejected() {
        let offer = Offer::dummy_percentage("twenty");
        let err = compute_savings(&offer, dec("50.00"), None).unwrap_err();
        assert!(matches!(err, OfferpassError::BadDiscountValue { .. }));
    }

    #[test]
    fn bogo_discounts_item_price() {
        let offer = Offer::dummy_bogo(dec("18.00"));
        let savings = compute_savings(&offer, dec("36.00"), None).unwrap();
        assert_eq!(savings.discount, dec("18.00"));
        assert_eq!(savings.final_amount, dec("18.00"));
    }

    #[test]
    fn bogo_clamps_to_bill() {
        let offer = Offer::dummy_bogo(dec("18.00"));
        let savings = compute_savings(&offer, dec("12.00"), None).unwrap();
        assert_eq!(savings.discount, dec("12.00"));
        assert_eq!(savings.final_amount, dec("0.00"));
    }

    #[test]
    fn bundle_at_expected_bill() {
        let offer = Offer::dummy_bundle(dec("100.00"), dec("75.00"));
        let savings = compute_savings(&offer, dec("100.00"), None).unwrap();
        assert_eq!(savings.discount, dec("25.00"));
        assert_eq!(savings.final_amount, dec("75.00"));
    }

    #[test]
    fn bundle_with_differing_bill_keeps_offer_discount() {
        let offer = Offer::dummy_bundle(dec("100.00"), dec("75.00"));
        let savings = compute_savings(&offer, dec("110.00"), None).unwrap();
        assert_eq!(savings.discount, dec("25.00"));
        assert_eq!(savings.final_amount, dec("85.00"));
    }

    #[test]
    fn bundle_bill_below_discount_rejected() {
        let offer = Offer::dummy_bundle(dec("100.00"), dec("75.00"));
        let err = compute_savings(&offer, dec("10.00"), None).unwrap_err();
        assert!(matches!(err, OfferpassError::InvalidAmount { .. }));
    }

    #[test]
    fn declared_final_wins_over_offer_type() {
        let offer = Offer::dummy_percentage("20%");
        let savings = compute_savings(&offer, dec("50.00"), Some(dec("35.00"))).unwrap();
        assert_eq!(savings.discount, dec("15.00"));
        assert_eq!(savings.final_amount, dec("35.00"));
    }

    #[test]
    fn declared_final_above_bill_rejected() {
        let offer = Offer::dummy_percentage("20%");
        let err = compute_savings(&offer, dec("50.00"), Some(dec("55.00"))).unwrap_err();
        assert!(matches!(err, OfferpassError::InvalidAmount { .. }));
    }

    #[test]
    fn three_fractional_digits_rejected() {
        let offer = Offer::dummy_percentage("20%");
        assert!(compute_savings(&offer, dec("50.001"), None).is_err());
        assert!(compute_savings(&offer, dec("50.00"), Some(dec("40.001"))).is_err());
    }

    #[test]
    fn zero_and_negative_bills_rejected() {
        let offer = Offer::dummy_percentage("20%");
        assert!(compute_savings(&offer, dec("0"), None).is_err());
        assert!(compute_savings(&offer, dec("-5.00"), None).is_err());
    }

    #[test]
    fn conservation_holds_across_kinds() {
        let cases: Vec<(Offer, Decimal, Option<Decimal>)> = vec![
            (Offer::dummy_percentage("33%"), dec("19.99"), None),
            (Offer::dummy_bogo(dec("7.77")), dec("23.10"), None),
            (Offer::dummy_bundle(dec("60.00"), dec("45.50")), dec("60.00"), None),
            (Offer::dummy_percentage("10%"), dec("88.88"), Some(dec("80.00"))),
        ];
        for (offer, bill, declared) in cases {
            let savings = compute_savings(&offer, bill, declared).unwrap();
            assert_eq!(
                savings.discount + savings.final_amount,
                bill,
                "conservation failed for {bill}"
            );
        }
    }
}
