//! Unit tests for the Amount module
//!
//! Tests cover creation, checked arithmetic, decimal conversion,
//! storage conversion, and summation.

use core_kernel::{Amount, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_from_cents_keeps_value() {
        let a = Amount::from_cents(30_000);
        assert_eq!(a.cents(), 30_000);
    }

    #[test]
    fn test_zero_is_zero() {
        assert!(Amount::zero().is_zero());
        assert_eq!(Amount::default(), Amount::zero());
    }

    #[test]
    fn test_from_u64() {
        let a: Amount = 250u64.into();
        assert_eq!(a, Amount::from_cents(250));
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_sub_withdrawal_scenario() {
        let balance = Amount::from_cents(300);
        let remaining = balance.checked_sub(Amount::from_cents(200)).unwrap();
        assert_eq!(remaining, Amount::from_cents(100));
    }

    #[test]
    fn test_checked_sub_to_exactly_zero() {
        let balance = Amount::from_cents(100);
        assert!(balance.checked_sub(balance).unwrap().is_zero());
    }

    #[test]
    fn test_checked_sub_rejects_negative_result() {
        let result = Amount::from_cents(100).checked_sub(Amount::from_cents(2000));
        assert!(matches!(result, Err(MoneyError::Underflow { minuend: 100, subtrahend: 2000 })));
    }

    #[test]
    fn test_checked_add_overflow() {
        let result = Amount::from_cents(u64::MAX - 1).checked_add(Amount::from_cents(2));
        assert_eq!(result, Err(MoneyError::Overflow));
    }

    #[test]
    fn test_saturating_add_clamps() {
        let a = Amount::from_cents(u64::MAX).saturating_add(Amount::from_cents(10));
        assert_eq!(a.cents(), u64::MAX);
    }

    #[test]
    fn test_sum_of_amounts() {
        let total: Amount = [120_000u64, 50, 80_010]
            .into_iter()
            .map(Amount::from_cents)
            .sum();
        assert_eq!(total, Amount::from_cents(200_060));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total: Amount = Vec::<Amount>::new().iter().sum();
        assert!(total.is_zero());
    }
}

mod conversion {
    use super::*;

    #[test]
    fn test_to_decimal_uses_two_places() {
        assert_eq!(Amount::from_cents(200_000).to_decimal(), dec!(2000.00));
        assert_eq!(Amount::from_cents(1).to_decimal(), dec!(0.01));
    }

    #[test]
    fn test_display_formats_major_units() {
        assert_eq!(Amount::from_cents(80_010).to_string(), "800.10");
    }

    #[test]
    fn test_to_i64_out_of_range() {
        let result = Amount::from_cents(u64::MAX).to_i64();
        assert!(matches!(result, Err(MoneyError::OutOfRange(_))));
    }

    #[test]
    fn test_try_from_negative_i64_fails() {
        assert!(matches!(Amount::try_from(-5_i64), Err(MoneyError::OutOfRange(_))));
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Amount::from_cents(300)).unwrap();
        assert_eq!(json, "300");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::from_cents(300));
    }
}
