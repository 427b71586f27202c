use rust_decimal::Decimal;

/// Fixed redemption value of one mile, in dollars.
pub fn mile_cash_value() -> Decimal {
    Decimal::new(1, 2)
}

/// Cash value of a miles amount.
pub fn miles_value(miles: Decimal) -> Decimal {
    miles * mile_cash_value()
}

/// Miles required to cover a cash price in full.
pub fn miles_to_cover(price: Decimal) -> Decimal {
    (price / mile_cash_value()).ceil()
}

/// Earning rule: one mile per dollar of the cash portion, floored.
pub fn earned_miles(cash_amount: Decimal) -> Decimal {
    cash_amount.floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_miles_value() {
        assert_eq!(miles_value(dec!(3000)), dec!(30.00));
        assert_eq!(miles_value(dec!(0)), dec!(0));
    }

    #[test]
    fn test_miles_to_cover_rounds_up() {
        assert_eq!(miles_to_cover(dec!(50.00)), dec!(5000));
        assert_eq!(miles_to_cover(dec!(0.015)), dec!(2));
    }

    #[test]
    fn test_earning_floors_cash_portion() {
        assert_eq!(earned_miles(dec!(120.40)), dec!(120));
        assert_eq!(earned_miles(dec!(0.99)), dec!(0));
    }
}
