use primitive_types::U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
pub enum MathError {
    AddOverflow(u8),
    CastOverflow(u8),
    DivByZero(u8),
    MulOverflow(u8),
    SubUnderflow(u8),
}

/// Sums `values`, failing instead of wrapping on overflow.
pub fn checked_sum<I>(values: I) -> Result<U256, MathError>
where
    I: IntoIterator<Item = U256>,
{
    values.into_iter().try_fold(U256::zero(), |acc, v| {
        acc.checked_add(v).ok_or(MathError::AddOverflow(1))
    })
}

/// Lossy conversion of a 256-bit integer into `f64`.
///
/// Limbs are little-endian, so the value is `Σ limb[i] * 2^(64 * i)`.
pub fn u256_to_f64(value: U256) -> f64 {
    const LIMB: f64 = 18_446_744_073_709_551_616.0; // 2^64
    value
        .0
        .iter()
        .rev()
        .fold(0f64, |acc, limb| acc * LIMB + *limb as f64)
}

/// Returns `numerator / denominator` as `f64`.
///
/// The integer part and the remainder are converted separately so that
/// ratios of two huge values keep their fractional digits.
pub fn ratio_to_f64(numerator: U256, denominator: U256) -> Result<f64, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivByZero(1))
    }
    let (quotient, remainder) = numerator.div_mod(denominator);
    Ok(u256_to_f64(quotient) + u256_to_f64(remainder) / u256_to_f64(denominator))
}

/// Converts a raw token amount into its human-readable value.
pub fn to_exact(raw: U256, decimals: u8) -> f64 {
    u256_to_f64(raw) / 10f64.powi(decimals as i32)
}

/// Liquidity-weighted average of fixed-point fractions.
///
/// Each item is `(value, weight)` where `value / precision` is the fraction.
/// The formula is:
/// Σ(value_i * weight_i) / (Σ(weight_i) * precision)
///
/// Returns `Ok(None)` when the total weight is zero.
pub fn weighted_average<I>(items: I, precision: U256) -> Result<Option<f64>, MathError>
where
    I: IntoIterator<Item = (U256, U256)>,
{
    let mut weighted = U256::zero();
    let mut total_weight = U256::zero();
    for (value, weight) in items {
        let product = value.checked_mul(weight).ok_or(MathError::MulOverflow(1))?;
        weighted = weighted
            .checked_add(product)
            .ok_or(MathError::AddOverflow(2))?;
        total_weight = total_weight
            .checked_add(weight)
            .ok_or(MathError::AddOverflow(3))?;
    }
    if total_weight.is_zero() {
        return Ok(None)
    }
    let denominator = total_weight
        .checked_mul(precision)
        .ok_or(MathError::MulOverflow(2))?;
    ratio_to_f64(weighted, denominator).map(Some)
}
