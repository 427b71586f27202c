use rust_decimal::Decimal;

use skylane_loyalty::conversion;

use crate::models::PaymentMethod;

/// How a purchase is funded. Produced by `split_payment` and persisted
/// verbatim on the booking row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSplit {
    pub method: PaymentMethod,
    pub miles_used: Decimal,
    pub cash_amount: Decimal,
}

impl PaymentSplit {
    pub fn cash_only(total_price: Decimal) -> Self {
        Self {
            method: PaymentMethod::Cash,
            miles_used: Decimal::ZERO,
            cash_amount: total_price,
        }
    }
}

/// Splits a price between redeemed miles and cash. When the offered miles
/// cover the whole price, only the miles actually needed are consumed;
/// otherwise everything offered is applied and cash covers the remainder.
pub fn split_payment(total_price: Decimal, miles_requested: Decimal) -> PaymentSplit {
    if miles_requested <= Decimal::ZERO {
        return PaymentSplit::cash_only(total_price);
    }

    let offered_value = conversion::miles_value(miles_requested);
    if offered_value >= total_price {
        PaymentSplit {
            method: PaymentMethod::Miles,
            miles_used: conversion::miles_to_cover(total_price),
            cash_amount: Decimal::ZERO,
        }
    } else {
        PaymentSplit {
            method: PaymentMethod::Mixed,
            miles_used: miles_requested,
            cash_amount: (total_price - offered_value).round_dp(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mixed_payment() {
        let split = split_payment(dec!(100.00), dec!(3000));
        assert_eq!(split.method, PaymentMethod::Mixed);
        assert_eq!(split.miles_used, dec!(3000));
        assert_eq!(split.cash_amount, dec!(70.00));
    }

    #[test]
    fn test_full_miles_payment_consumes_only_what_is_needed() {
        let split = split_payment(dec!(50.00), dec!(10000));
        assert_eq!(split.method, PaymentMethod::Miles);
        assert_eq!(split.miles_used, dec!(5000));
        assert_eq!(split.cash_amount, dec!(0));
    }

    #[test]
    fn test_no_miles_offered_is_cash() {
        let split = split_payment(dec!(80.00), Decimal::ZERO);
        assert_eq!(split.method, PaymentMethod::Cash);
        assert_eq!(split.miles_used, dec!(0));
        assert_eq!(split.cash_amount, dec!(80.00));
    }

    #[test]
    fn test_split_reconstructs_total() {
        for (total, miles) in [
            (dec!(100.00), dec!(3000)),
            (dec!(129.99), dec!(1)),
            (dec!(42.50), dec!(4250)),
        ] {
            let split = split_payment(total, miles);
            let paid = split.cash_amount + split.miles_used * dec!(0.01);
            assert_eq!(paid, total, "split of {total} with {miles} miles");
        }
    }
}
