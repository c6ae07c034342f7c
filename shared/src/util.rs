use rust_decimal::{Decimal, RoundingStrategy};

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round a money amount to cents, half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Money amount in integer cents, as payment gateways expect it
pub fn to_cents(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (round_money(amount) * Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(12325, 3)), Decimal::new(1233, 2));
        assert_eq!(round_money(Decimal::new(10, 0)), Decimal::new(10, 0));
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(Decimal::new(8550, 2)), 8550);
        assert_eq!(to_cents(Decimal::new(1, 0)), 100);
        assert_eq!(to_cents(Decimal::new(10005, 3)), 1001);
    }
}
