//! Pure figures derived from pool data and live prices.
//! Percentages are plain numbers (`12.5` means 12.5%); fractions are in `[0, 1]`.

use amm_helpers::{
    constants::{
        DAYS_PER_YEAR,
        SECONDS_PER_YEAR,
    },
    math::{
        ratio_to_f64,
        weighted_average,
        MathError,
    },
};
use farm_trait::{
    FarmPool,
    FarmSchedule,
    PriceOracle,
    TokenAmount,
};
use primitive_types::U256;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// USD value of everything paid out by the pool over its lifetime.
pub fn total_reward_value(pool: &FarmPool, prices: &dyn PriceOracle) -> f64 {
    usd_value(&pool.total_rewards, prices)
}

/// Reward APR of a pool.
///
/// Uses the indexer's figure when present. Otherwise annualizes the lifetime
/// rewards over the schedule length, falling back to the emission rate
/// `reward_per_unit * units_per_year * 100 / pool_tvl` when the lifetime total
/// is unknown. Block schedules count `blocks_per_year` units per year.
/// Degenerate inputs (zero TVL, no rewards) yield `0`.
pub fn farm_apr(pool: &FarmPool, prices: &dyn PriceOracle, blocks_per_year: f64) -> f64 {
    if let Some(apr) = pool.apr.filter(|apr| *apr != 0.0) {
        return apr
    }
    let units_per_year = match pool.schedule {
        FarmSchedule::Timestamp { .. } => SECONDS_PER_YEAR as f64,
        FarmSchedule::Block { .. } => blocks_per_year,
    };
    let units = pool.schedule.length();
    let rewards = total_reward_value(pool, prices);
    let yearly = if rewards != 0.0 && units != 0 {
        rewards * units_per_year / units as f64
    } else {
        usd_value(&pool.reward_per_unit, prices) * units_per_year
    };
    finite_or_zero(yearly * 100.0 / pool.pool_tvl)
}

/// Trading-fee APR of an elastic pool.
///
/// Uses the indexer's figure when present, otherwise annualizes the fee
/// delta over the last 24h: `(fees_usd - fees_24h_ago) * 100 * 365 / pool_tvl`.
pub fn pool_apr(pool: &FarmPool, fees_24h_ago: Option<f64>) -> f64 {
    if let Some(apr) = pool.pool_apr.filter(|apr| *apr != 0.0) {
        return apr
    }
    match (pool.fees_usd, fees_24h_ago) {
        (Some(fees), Some(ago)) if fees != 0.0 && ago != 0.0 => {
            finite_or_zero((fees - ago) * 100.0 * DAYS_PER_YEAR / pool.pool_tvl)
        }
        _ => 0.0,
    }
}

/// Trading-fee APR of a classic pool from its last-day fees.
pub fn trading_fee_apr(one_day_fee_usd: f64, pool_tvl: f64) -> f64 {
    finite_or_zero(one_day_fee_usd * DAYS_PER_YEAR * 100.0 / pool_tvl)
}

/// Reward APR plus trading-fee APR, dropping the latter when it is an outlier.
pub fn total_apr(farm_apr: f64, trading_fee_apr: f64, max_allow_apr: f64) -> f64 {
    if trading_fee_apr < max_allow_apr {
        farm_apr + trading_fee_apr
    } else {
        farm_apr
    }
}

/// Staked TVL in USD: the indexer's figure, or both token legs at live prices.
pub fn staked_tvl(pool: &FarmPool, prices: &dyn PriceOracle) -> f64 {
    match pool.stake_tvl {
        Some(tvl) if tvl != 0.0 => tvl,
        _ => pool.tvl_token0.usd(prices) + pool.tvl_token1.usd(prices),
    }
}

pub fn usd_value<'a>(
    amounts: impl IntoIterator<Item = &'a TokenAmount>,
    prices: &dyn PriceOracle,
) -> f64 {
    amounts.into_iter().map(|amount| amount.usd(prices)).sum()
}

/// Sums amounts per token address, keeping first-seen order.
pub fn aggregate_amounts<'a>(
    amounts: impl IntoIterator<Item = &'a TokenAmount>,
) -> Result<Vec<TokenAmount>, MathError> {
    let mut totals: Vec<TokenAmount> = Vec::new();
    for amount in amounts {
        match totals.iter_mut().find(|t| t.token == amount.token) {
            Some(total) => *total = total.checked_add(amount)?,
            None => totals.push(*amount),
        }
    }
    Ok(totals)
}

/// Share of the target trading volume a user's staked liquidity has supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetVolume {
    pub fraction: f64,
}

impl TargetVolume {
    /// Fill of the progress bar, `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.fraction.clamp(0.0, 1.0)
    }

    pub fn is_fully_unlocked(&self) -> bool {
        self.fraction >= 1.0
    }

    /// e.g. `87.50%`.
    pub fn label(&self) -> String {
        format!("{:.2}%", self.fraction * 100.0)
    }
}

/// Unlock fraction of a single position.
pub fn position_target_volume(
    vesting_volume: U256,
    precision: U256,
) -> Result<TargetVolume, MathError> {
    Ok(TargetVolume {
        fraction: ratio_to_f64(vesting_volume, precision)?,
    })
}

/// Liquidity-weighted unlock fraction over `(vesting_volume, staked_liquidity)` pairs.
///
/// Σ(vesting_i / precision * staked_i) / Σ(staked_i)
///
/// `None` when nothing is staked.
pub fn target_volume<I>(items: I, precision: U256) -> Result<Option<TargetVolume>, MathError>
where
    I: IntoIterator<Item = (U256, U256)>,
{
    Ok(weighted_average(items, precision)?.map(|fraction| TargetVolume { fraction }))
}
