/*
 * Numeric primitives: constant-product and sqrt-price math, slippage
 * bounds, and price-impact warning bands
 */

use ethers::types::U256;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{PriceImpactWarning, WarningLevel};

/// Uniswap V2 fee: 0.3%, expressed as 997/1000.
const V2_FEE_NUMERATOR: u64 = 997;
const V2_FEE_DENOMINATOR: u64 = 1000;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("insufficient liquidity for constant-product quote")]
    InsufficientLiquidity,

    #[error("arithmetic overflow in quote math")]
    Overflow,
}

/// Constant-product output with the 0.3% fee embedded:
/// `out = (in·997·Rout) / (Rin·1000 + in·997)`, floor division.
///
/// The result is strictly less than `reserve_out` for any positive input.
pub fn v2_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, MathError> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(MathError::InsufficientLiquidity);
    }

    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(V2_FEE_NUMERATOR))
        .ok_or(MathError::Overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(MathError::Overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(V2_FEE_DENOMINATOR))
        .ok_or(MathError::Overflow)?
        .checked_add(amount_in_with_fee)
        .ok_or(MathError::Overflow)?;

    Ok(numerator / denominator)
}

/// Constant-product price impact in percent: the pool's marginal price after
/// the swap against the price before it.
///
/// `before = Rout/Rin`, `after = (Rout−out)/(Rin+in)`. Decimal scaling of
/// the two tokens cancels in the ratio, so raw reserves are used directly.
#[must_use]
pub fn v2_price_impact(
    amount_in: U256,
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Decimal {
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
        return Decimal::from(100);
    }

    let before = u256_to_f64(reserve_out) / u256_to_f64(reserve_in);
    let after = u256_to_f64(reserve_out - amount_out) / u256_to_f64(reserve_in + amount_in);
    if !before.is_finite() || !after.is_finite() || before == 0.0 {
        return Decimal::ZERO;
    }

    percent_decimal(((before - after).abs() / before) * 100.0)
}

/// Instantaneous price of token0 in token1 from a pool's `sqrtPriceX96`,
/// expressed in human units: `(sqrt/2^96)^2 · 10^(decimals0−decimals1)`.
///
/// The X192 intermediate does not fit in 256 bits, hence the big-integer hop.
#[must_use]
pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256, decimals0: u8, decimals1: u8) -> f64 {
    if sqrt_price_x96.is_zero() {
        return 0.0;
    }

    let mut bytes = [0u8; 32];
    sqrt_price_x96.to_big_endian(&mut bytes);
    let price_x192 = BigUint::from_bytes_be(&bytes).pow(2u32);

    // A 78-digit decimal string parses into f64 without precision surprises
    // beyond the expected ~1e-16 relative error.
    let raw: f64 = price_x192.to_string().parse().unwrap_or(f64::MAX);
    let scale = 10f64.powi(i32::from(decimals0) - i32::from(decimals1));
    (raw / 2f64.powi(192)) * scale
}

/// Inverse of [`sqrt_price_x96_to_price`]: approximate `sqrtPriceX96` for a
/// human-unit price of token0 in token1.
#[must_use]
pub fn price_to_sqrt_price_x96(price: f64, decimals0: u8, decimals1: u8) -> U256 {
    if !(price.is_finite() && price > 0.0) {
        return U256::zero();
    }
    let scale = 10f64.powi(i32::from(decimals1) - i32::from(decimals0));
    let sqrt = (price * scale).sqrt() * 2f64.powi(96);
    f64_to_u256(sqrt)
}

/// V3 price impact from pre- and post-swap sqrt prices:
/// `|(after/before)^2 − 1| · 100`.
#[must_use]
pub fn v3_price_impact(sqrt_before: U256, sqrt_after: U256) -> Decimal {
    if sqrt_before.is_zero() {
        return Decimal::ZERO;
    }

    let ratio = u256_to_f64(sqrt_after) / u256_to_f64(sqrt_before);
    if !ratio.is_finite() {
        return Decimal::ZERO;
    }

    percent_decimal((ratio * ratio - 1.0).abs() * 100.0)
}

/// Reconstruct the post-swap sqrt price from the execution/mid-price ratio:
/// `after = before · sqrt(|exec/mid|)`.
///
/// Heuristic fallback for quoters that report only `amountOut`; a quoter
/// returning `sqrtPriceX96After` directly should be preferred where the
/// target chain offers one.
#[must_use]
pub fn sqrt_price_after_swap(sqrt_before: U256, execution_price: f64, mid_price: f64) -> U256 {
    if !(mid_price.is_finite() && mid_price > 0.0) || !execution_price.is_finite() {
        return sqrt_before;
    }

    let ratio = (execution_price / mid_price).abs();
    f64_to_u256(u256_to_f64(sqrt_before) * ratio.sqrt())
}

/// Slippage tolerance in basis points: `floor(percent · 100)`, clamped to
/// [0, 10000].
#[must_use]
pub fn slippage_bps(slippage_percent: f64) -> u64 {
    if !(slippage_percent.is_finite()) || slippage_percent <= 0.0 {
        return 0;
    }
    ((slippage_percent * 100.0).floor() as u64).min(BPS_DENOMINATOR)
}

/// Minimum acceptable output under a slippage tolerance:
/// `out · (10000 − bps) / 10000`, floor division.
#[must_use]
pub fn min_amount_out(amount_out: U256, slippage_percent: f64) -> U256 {
    let bps = slippage_bps(slippage_percent);
    amount_out.saturating_mul(U256::from(BPS_DENOMINATOR - bps)) / U256::from(BPS_DENOMINATOR)
}

/// Maximum acceptable input, symmetric with [`min_amount_out`].
#[must_use]
pub fn max_amount_in(amount_in: U256, slippage_percent: f64) -> U256 {
    let bps = slippage_bps(slippage_percent);
    amount_in.saturating_mul(U256::from(BPS_DENOMINATOR + bps)) / U256::from(BPS_DENOMINATOR)
}

/// Classify a price impact into its warning band. Only `extreme` blocks.
#[must_use]
pub fn warning_for_impact(impact_percent: Decimal) -> PriceImpactWarning {
    let (level, message) = if impact_percent < Decimal::ONE {
        (WarningLevel::Low, "Minimal price impact")
    } else if impact_percent < Decimal::from(3) {
        (WarningLevel::Medium, "Moderate price impact")
    } else if impact_percent < Decimal::from(5) {
        (
            WarningLevel::High,
            "High price impact, consider reducing trade size",
        )
    } else if impact_percent < Decimal::from(15) {
        (
            WarningLevel::VeryHigh,
            "Very high price impact, this trade will move the pool substantially",
        )
    } else {
        (
            WarningLevel::Extreme,
            "Extreme price impact, execution is blocked by default",
        )
    };

    PriceImpactWarning {
        level,
        should_block: level == WarningLevel::Extreme,
        message: message.to_string(),
    }
}

/// Lossy conversion for ratio math only; never feeds back into amounts.
#[must_use]
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(f64::MAX)
}

fn f64_to_u256(value: f64) -> U256 {
    if !(value.is_finite() && value > 0.0) {
        return U256::zero();
    }
    U256::from_dec_str(&format!("{value:.0}")).unwrap_or(U256::MAX)
}

fn percent_decimal(value: f64) -> Decimal {
    Decimal::try_from(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(4)
        .max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;

    fn wei(n: u128) -> U256 {
        U256::from(n)
    }

    #[test]
    fn v2_amount_out_matches_constant_product_identity() {
        let amount_in = wei(1_000_000_000_000_000); // 0.001 at 18 decimals
        let reserve_in = wei(2_620_000_000_000_000);
        let reserve_out = wei(4_168_985_000_000_000_000);

        let out = v2_amount_out(amount_in, reserve_in, reserve_out).unwrap();

        let expected = (amount_in * U256::from(997u64) * reserve_out)
            / (reserve_in * U256::from(1000u64) + amount_in * U256::from(997u64));
        assert_eq!(out, expected);
        assert!(out < reserve_out);
        // ~1.149e18 of the output token.
        assert!(out > wei(1_140_000_000_000_000_000));
        assert!(out < wei(1_160_000_000_000_000_000));
    }

    #[test]
    fn v2_amount_out_rejects_empty_pools() {
        assert_eq!(
            v2_amount_out(U256::zero(), wei(1), wei(1)),
            Err(MathError::InsufficientLiquidity)
        );
        assert_eq!(
            v2_amount_out(wei(1), U256::zero(), wei(1)),
            Err(MathError::InsufficientLiquidity)
        );
        assert_eq!(
            v2_amount_out(wei(1), wei(1), U256::zero()),
            Err(MathError::InsufficientLiquidity)
        );
    }

    #[test]
    fn v2_price_impact_matches_reference_pool() {
        let amount_in = wei(1_000_000_000_000_000);
        let reserve_in = wei(2_620_000_000_000_000);
        let reserve_out = wei(4_168_985_000_000_000_000);
        let out = v2_amount_out(amount_in, reserve_in, reserve_out).unwrap();

        let impact = v2_price_impact(amount_in, out, reserve_in, reserve_out)
            .to_f64()
            .unwrap();
        assert!((impact - 47.57).abs() < 0.05, "impact was {impact}");
    }

    #[test]
    fn v2_price_impact_is_monotone_in_amount_in() {
        let reserve_in = wei(2_620_000_000_000_000);
        let reserve_out = wei(4_168_985_000_000_000_000);

        let mut last = Decimal::ZERO;
        for amount in [
            wei(100_000_000_000),
            wei(10_000_000_000_000),
            wei(1_000_000_000_000_000),
            wei(100_000_000_000_000_000),
        ] {
            let out = v2_amount_out(amount, reserve_in, reserve_out).unwrap();
            let impact = v2_price_impact(amount, out, reserve_in, reserve_out);
            assert!(impact >= last, "impact regressed at input {amount}");
            last = impact;
        }
    }

    #[test]
    fn sqrt_price_conversion_is_symmetric() {
        let one_to_one = U256::from(1) << 96;
        let price = sqrt_price_x96_to_price(one_to_one, 18, 18);
        assert!((price - 1.0).abs() < 1e-9);

        // 18/6 decimal spread shifts the human price by 1e12.
        let shifted = sqrt_price_x96_to_price(one_to_one, 18, 6);
        assert!((shifted - 1e12).abs() / 1e12 < 1e-9);

        let back = price_to_sqrt_price_x96(shifted, 18, 6);
        let rel = (u256_to_f64(back) - u256_to_f64(one_to_one)).abs() / u256_to_f64(one_to_one);
        assert!(rel < 1e-6);
    }

    #[test]
    fn v3_price_impact_from_sqrt_ratio() {
        let before = U256::from(1) << 96;
        assert_eq!(v3_price_impact(before, before), Decimal::ZERO);

        // after = before * sqrt(0.99) => priceRatio 0.99 => 1% impact.
        let after = f64_to_u256(u256_to_f64(before) * 0.99f64.sqrt());
        let impact = v3_price_impact(before, after).to_f64().unwrap();
        assert!((impact - 1.0).abs() < 1e-3, "impact was {impact}");
    }

    #[test]
    fn sqrt_price_after_swap_tracks_execution_ratio() {
        let before = U256::from(1) << 96;
        let after = sqrt_price_after_swap(before, 950.0, 1000.0);
        let ratio = u256_to_f64(after) / u256_to_f64(before);
        assert!((ratio * ratio - 0.95).abs() < 1e-6);

        // Degenerate mid price leaves the input untouched.
        assert_eq!(sqrt_price_after_swap(before, 950.0, 0.0), before);
    }

    #[test]
    fn slippage_floor_and_laws() {
        assert_eq!(slippage_bps(0.5), 50);
        assert_eq!(slippage_bps(0.559), 55);
        assert_eq!(slippage_bps(0.0), 0);
        assert_eq!(slippage_bps(250.0), 10_000);

        let amount = wei(1_000_000_000);
        // slip(a, 0) = a
        assert_eq!(min_amount_out(amount, 0.0), amount);
        // slip(slip(a, p), 0) = slip(a, p)
        let slipped = min_amount_out(amount, 0.5);
        assert_eq!(min_amount_out(slipped, 0.0), slipped);
        assert_eq!(slipped, amount * U256::from(9950u64) / U256::from(10_000u64));
        assert!(slipped <= amount);

        assert_eq!(
            max_amount_in(amount, 0.5),
            amount * U256::from(10_050u64) / U256::from(10_000u64)
        );
    }

    #[test]
    fn warning_bands_cover_the_documented_ranges() {
        let cases = [
            ("0.0", WarningLevel::Low, false),
            ("0.99", WarningLevel::Low, false),
            ("1.0", WarningLevel::Medium, false),
            ("2.99", WarningLevel::Medium, false),
            ("3.0", WarningLevel::High, false),
            ("4.99", WarningLevel::High, false),
            ("5.0", WarningLevel::VeryHigh, false),
            ("14.99", WarningLevel::VeryHigh, false),
            ("15.0", WarningLevel::Extreme, true),
            ("47.57", WarningLevel::Extreme, true),
        ];
        for (impact, level, blocks) in cases {
            let warning = warning_for_impact(impact.parse().unwrap());
            assert_eq!(warning.level, level, "impact {impact}");
            assert_eq!(warning.should_block, blocks, "impact {impact}");
        }
    }
}
