use alloy::primitives::U256;
use anyhow::Result;
use rust_decimal::{Decimal, RoundingStrategy};

/// Converts a fixed point on-chain value into a `Decimal`.
///
/// Values too large for `Decimal` saturate to `Decimal::MAX`; callers cap them
/// where that matters (e.g. the health factor of a debt-free account).
pub fn divide_by_precision_decimal(value: U256, precision: u8) -> Decimal {
    let scale = U256::from(10).pow(U256::from(precision));

    // Perform integer division and get both quotient and remainder
    let (quotient, remainder) = match (value.checked_div(scale), value.checked_rem(scale)) {
        (Some(q), Some(r)) => (q, r),
        _ => return Decimal::MAX,
    };

    let quotient = match u128::try_from(quotient)
        .ok()
        .and_then(|q| Decimal::try_from_i128_with_scale(q as i128, 0).ok())
    {
        Some(q) => q,
        None => return Decimal::MAX,
    };

    // remainder < 10^precision, so it always fits once precision <= 28
    let remainder = match u128::try_from(remainder)
        .ok()
        .and_then(|r| Decimal::try_from_i128_with_scale(r as i128, precision as u32).ok())
    {
        Some(r) => r,
        None => return Decimal::MAX,
    };

    quotient
        .checked_add(remainder)
        .map(|value| value.normalize())
        .unwrap_or(Decimal::MAX)
}

/// Converts a user-facing amount into its fixed point on-chain value.
///
/// Digits beyond `decimals` are truncated.
pub fn parse_units_decimal(amount: Decimal, decimals: u8) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        anyhow::bail!("cannot convert negative amount {} to units", amount);
    }

    let truncated = amount.round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero);
    let mantissa = u128::try_from(truncated.mantissa())
        .map_err(|_| anyhow::anyhow!("amount {} is out of range", amount))?;
    let missing_scale = decimals as u32 - truncated.scale();

    U256::from(mantissa)
        .checked_mul(U256::from(10).pow(U256::from(missing_scale)))
        .ok_or_else(|| anyhow::anyhow!("amount {} overflows uint256", amount))
}

/// Rounds half away from zero, the way amount fields are displayed
pub fn round_for_display(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}
