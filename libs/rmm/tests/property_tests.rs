//! Replication Engine Property Tests
//!
//! These tests validate mathematical properties that must always hold for
//! the replication curve and the pool built on it, regardless of the
//! specific calibration or reserve state.

use proptest::prelude::*;
use rmm::cumulative_normal::{cdf, inverse_cdf};
use rmm::{
    dec, ArbitrageOutcome, Arbitrageur, Calibration, CurveParams, FixedPointX64, Pool,
    ReplicationMath, RmmError, Wei, PERCENTAGE, SECONDS_PER_YEAR,
};
use rust_decimal::Decimal;

prop_compose! {
    fn valid_curve()
        (
            strike in 1.0f64..5_000.0,
            sigma_bps in 1_000u32..20_000,
            tau_days in 1u64..730,
        ) -> CurveParams {
        CurveParams::new(
            strike,
            sigma_bps as f64 / PERCENTAGE as f64,
            (tau_days * 86_400) as f64 / SECONDS_PER_YEAR as f64,
        )
    }
}

prop_compose! {
    fn valid_pool()
        (
            strike in 1u32..5_000,
            sigma_bps in 1_000u32..20_000,
            gamma in 9_900u32..=10_000,
            risky_bps in 500i64..9_500,
            liquidity in 1i64..1_000,
        ) -> Pool {
        let calibration = Calibration::new(
            Wei::from_decimal(Decimal::from(strike), 18).unwrap(),
            sigma_bps,
            SECONDS_PER_YEAR,
            0,
            gamma,
            18,
            18,
        )
        .unwrap();
        Pool::initialize(
            calibration,
            Decimal::new(risky_bps, 4),
            Wei::from_decimal(Decimal::from(liquidity), 18).unwrap(),
        )
        .unwrap()
    }
}

proptest! {
    #[test]
    fn prop_cdf_symmetry(x in -10.0f64..10.0) {
        prop_assert!((cdf(x) + cdf(-x) - 1.0).abs() <= 1e-9);
    }

    #[test]
    fn prop_cdf_monotonic(x in -8.0f64..8.0, step in 1e-3f64..1.0) {
        prop_assert!(cdf(x + step) >= cdf(x));
    }

    #[test]
    fn prop_inverse_cdf_recovers_quantile(p in 0.001f64..0.999) {
        let x = inverse_cdf(p).unwrap();
        prop_assert!((cdf(x) - p).abs() < 2e-7);
    }

    #[test]
    fn prop_trading_function_round_trip(curve in valid_curve(), risky in 0.05f64..0.95) {
        let stable = ReplicationMath::trading_function(0.0, risky, 1.0, &curve).unwrap();
        let recovered = ReplicationMath::inverse_trading_function(0.0, stable, 1.0, &curve).unwrap();
        let refined = ReplicationMath::solve_risky_given_stable(0.0, stable, 1.0, &curve).unwrap();

        // Closed form compounds the CDF error through the inverse; Newton
        // removes most of it
        prop_assert!((recovered - risky).abs() < 0.02, "closed form {} vs {}", recovered, risky);
        prop_assert!((refined - risky).abs() <= (recovered - risky).abs() + 1e-12);
    }

    #[test]
    fn prop_stable_reserve_within_strike(curve in valid_curve(), risky in 0.0f64..=1.0) {
        let stable = ReplicationMath::trading_function(0.0, risky, 1.0, &curve).unwrap();
        prop_assert!(stable >= 0.0 && stable <= curve.strike);
    }

    #[test]
    fn prop_fixed_point_truncates_toward_zero(numerator in any::<i64>(), denominator in 1i64..1_000_000) {
        let fixed = FixedPointX64::from_ratio(numerator as i128, denominator as i128).unwrap();
        let exact = (numerator as i128) << 64;
        let product = fixed.raw() * denominator as i128;

        // |fixed · d| never exceeds |n · 2^64| and misses it by less than d
        prop_assert!(product.unsigned_abs() <= exact.unsigned_abs());
        prop_assert!(exact.unsigned_abs() - product.unsigned_abs() < denominator as u128);
    }

    #[test]
    fn prop_invariant_non_decreasing_risky_in(pool in valid_pool(), fraction in 0.001f64..0.9) {
        let max_in = pool.max_risky_in().unwrap();
        let amount = Wei::from_f64(max_in.to_f64() * fraction, 18).unwrap();

        let result = pool.virtual_swap_amount_in_risky(amount).unwrap();
        prop_assert!(result.invariant_after >= result.invariant_before);
        prop_assert!(!result.delta_out.is_negative());
        prop_assert!(!result.reserve.stable.is_negative());
    }

    #[test]
    fn prop_invariant_non_decreasing_stable_in(pool in valid_pool(), fraction in 0.001f64..0.9) {
        let max_in = pool.max_stable_in().unwrap();
        let amount = Wei::from_f64(max_in.to_f64() * fraction, 18).unwrap();

        let result = pool.virtual_swap_amount_in_stable(amount).unwrap();
        prop_assert!(result.invariant_after >= result.invariant_before);
        prop_assert!(!result.reserve.risky.is_negative());
    }

    #[test]
    fn prop_zero_input_pays_nothing(pool in valid_pool(), elapsed_days in 0u64..365) {
        let mut pool = pool;
        pool.advance_time(elapsed_days * 86_400).unwrap();

        let risky_in = pool.virtual_swap_amount_in_risky(Wei::zero(18)).unwrap();
        let stable_in = pool.virtual_swap_amount_in_stable(Wei::zero(18)).unwrap();
        prop_assert!(risky_in.delta_out.is_zero());
        prop_assert!(stable_in.delta_out.is_zero());
        prop_assert_eq!(&risky_in.reserve, pool.reserve());
        prop_assert_eq!(&stable_in.reserve, pool.reserve());
    }

    #[test]
    fn prop_decayed_pool_reserves_stay_non_negative(
        pool in valid_pool(),
        elapsed_days in 1u64..365,
        fraction in 0.001f64..1.0,
    ) {
        let mut pool = pool;
        pool.advance_time(elapsed_days * 86_400).unwrap();

        let max_in = pool.max_risky_in().unwrap();
        let amount = Wei::from_f64(max_in.to_f64() * fraction, 18).unwrap();
        match pool.swap_amount_in_risky(amount) {
            Ok(result) => {
                prop_assert!(!result.reserve.stable.is_negative());
                prop_assert!(result.invariant_after >= result.invariant_before);
            }
            Err(RmmError::InvalidReserves(_)) => {}
            Err(err) => prop_assert!(false, "unexpected error {}", err),
        }
        prop_assert!(!pool.reserve().stable.is_negative());
    }

    #[test]
    fn prop_arbitrage_moves_price_toward_reference(pool in valid_pool(), multiplier in 0.5f64..2.0) {
        let mut pool = pool;
        let spot = pool.spot_price().unwrap();
        let reference = spot * multiplier;
        let gap_before = (spot - reference).abs();

        let outcome = Arbitrageur::default().arbitrage_exactly(reference, &mut pool).unwrap();
        let gap_after = (pool.spot_price().unwrap() - reference).abs();

        match outcome {
            ArbitrageOutcome::Executed(trade) => {
                prop_assert!(trade.profit > 0.0);
                prop_assert!(gap_after < gap_before);
            }
            _ => prop_assert_eq!(gap_after, gap_before),
        }
    }
}

#[test]
fn test_wei_decimal_helper() {
    let amount = Wei::from_decimal(dec!(1.25), 6).unwrap();
    assert_eq!(amount.raw(), 1_250_000);
}
