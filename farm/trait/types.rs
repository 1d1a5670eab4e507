//! Farm, pool and position data as read from the chain and the price feed.
//! Everything here is refreshed wholesale on every poll; nothing is mutated in place.

use std::collections::{
    BTreeMap,
    HashMap,
};

use amm_helpers::math::{
    to_exact,
    MathError,
};
use primitive_types::U256;

use crate::{
    Address,
    FarmError,
    PriceOracle,
};

pub type NftId = U256;
pub type Pid = u32;
pub type Timestamp = u64;
pub type BlockNumber = u64;

pub const LP_TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Token {
            address,
            symbol: symbol.into(),
            name: name.into(),
            decimals,
        }
    }
}

/// Raw amount of a token, in its smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenAmount {
    pub token: Address,
    pub decimals: u8,
    pub raw: U256,
}

/// A pending or claimed farming reward.
pub type Reward = TokenAmount;

impl TokenAmount {
    pub fn new(token: &Token, raw: impl Into<U256>) -> Self {
        TokenAmount {
            token: token.address,
            decimals: token.decimals,
            raw: raw.into(),
        }
    }

    pub fn zero(token: &Token) -> Self {
        Self::new(token, U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Human-readable amount (`raw / 10^decimals`).
    pub fn to_exact(&self) -> f64 {
        to_exact(self.raw, self.decimals)
    }

    /// Live USD value; unknown prices count as zero.
    pub fn usd<P: PriceOracle + ?Sized>(&self, prices: &P) -> f64 {
        self.to_exact() * prices.price(&self.token)
    }

    pub fn checked_add(&self, other: &TokenAmount) -> Result<TokenAmount, MathError> {
        Ok(TokenAmount {
            raw: self
                .raw
                .checked_add(other.raw)
                .ok_or(MathError::AddOverflow(10))?,
            ..*self
        })
    }

    /// `self * numerator / denominator`, rounding down.
    pub fn mul_div(&self, numerator: U256, denominator: U256) -> Result<TokenAmount, MathError> {
        if denominator.is_zero() {
            return Err(MathError::DivByZero(10))
        }
        let raw = self
            .raw
            .checked_mul(numerator)
            .ok_or(MathError::MulOverflow(10))?
            / denominator;
        Ok(TokenAmount { raw, ..*self })
    }
}

/// When a farm (or one of its pools) runs.
///
/// Elastic and fair-launch v2 farms are scheduled by timestamp, legacy
/// fair-launch v1 farms by block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmSchedule {
    Timestamp {
        start: Timestamp,
        end: Timestamp,
    },
    Block {
        start_block: BlockNumber,
        end_block: BlockNumber,
    },
}

impl FarmSchedule {
    pub fn start(&self) -> u64 {
        match self {
            FarmSchedule::Timestamp { start, .. } => *start,
            FarmSchedule::Block { start_block, .. } => *start_block,
        }
    }

    pub fn end(&self) -> u64 {
        match self {
            FarmSchedule::Timestamp { end, .. } => *end,
            FarmSchedule::Block { end_block, .. } => *end_block,
        }
    }

    /// Length of the schedule in its own units: seconds or blocks.
    pub fn length(&self) -> u64 {
        self.end().saturating_sub(self.start())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FarmKind {
    /// Concentrated-liquidity farm; positions are NFTs.
    Elastic,
    /// Constant-product farm; positions are LP token balances.
    Classic,
}

/// A pool inside a farm, identified by `pid`.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmPool {
    pub pid: Pid,
    pub pool_address: Address,
    pub token0: Token,
    pub token1: Token,
    pub fee_tier: u32,
    pub schedule: FarmSchedule,
    pub reward_tokens: Vec<Token>,
    /// Rewards paid out over the whole farm duration, one entry per reward token.
    pub total_rewards: Vec<TokenAmount>,
    /// Emission rate per reward token: per second for timestamp schedules,
    /// per block for block schedules.
    pub reward_per_unit: Vec<TokenAmount>,
    /// Staked TVL in USD when the indexer provides it.
    pub stake_tvl: Option<f64>,
    pub tvl_token0: TokenAmount,
    pub tvl_token1: TokenAmount,
    /// TVL of the whole AMM pool in USD.
    pub pool_tvl: f64,
    /// Farm APR override.
    pub apr: Option<f64>,
    /// Trading-fee APR override.
    pub pool_apr: Option<f64>,
    /// Cumulative fees of the pool in USD.
    pub fees_usd: Option<f64>,
    /// Fees of the last 24h in USD (classic pools).
    pub one_day_fee_usd: Option<f64>,
    /// LP token supply of a classic pool.
    pub lp_total_supply: U256,
    /// Reserves of a classic pool backing `lp_total_supply`.
    pub reserve0: TokenAmount,
    pub reserve1: TokenAmount,
    /// Non-zero when rewards vest against a target trading volume.
    pub fee_target: U256,
    /// Seconds over which harvested rewards unlock.
    pub vesting_duration: u64,
}

impl FarmPool {
    pub fn new(
        pid: Pid,
        pool_address: Address,
        token0: Token,
        token1: Token,
        fee_tier: u32,
        schedule: FarmSchedule,
    ) -> Self {
        FarmPool {
            pid,
            pool_address,
            tvl_token0: TokenAmount::zero(&token0),
            tvl_token1: TokenAmount::zero(&token1),
            reserve0: TokenAmount::zero(&token0),
            reserve1: TokenAmount::zero(&token1),
            token0,
            token1,
            fee_tier,
            schedule,
            reward_tokens: Vec::new(),
            total_rewards: Vec::new(),
            reward_per_unit: Vec::new(),
            stake_tvl: None,
            pool_tvl: 0.0,
            apr: None,
            pool_apr: None,
            fees_usd: None,
            one_day_fee_usd: None,
            lp_total_supply: U256::zero(),
            fee_target: U256::zero(),
            vesting_duration: 0,
        }
    }

    /// Pair label, e.g. `ETH - USDC`.
    pub fn pair_key(&self) -> String {
        format!("{} - {}", self.token0.symbol, self.token1.symbol)
    }

    pub fn has_fee_target(&self) -> bool {
        !self.fee_target.is_zero()
    }

    /// The LP token of a classic pool lives at the pool address.
    pub fn lp_token(&self) -> Token {
        Token::new(
            self.pool_address,
            format!("{}-{} LP", self.token0.symbol, self.token1.symbol),
            format!("{} LP", self.pair_key()),
            LP_TOKEN_DECIMALS,
        )
    }

    /// Reserves backing `lp` LP tokens. Zero while the supply is unknown.
    pub fn lp_share(&self, lp: U256) -> Result<(TokenAmount, TokenAmount), FarmError> {
        if self.lp_total_supply.is_zero() {
            return Ok((
                TokenAmount { raw: U256::zero(), ..self.reserve0 },
                TokenAmount { raw: U256::zero(), ..self.reserve1 },
            ))
        }
        amm_helpers::ensure!(lp <= self.lp_total_supply, FarmError::InsufficientBalance);
        Ok((
            self.reserve0.mul_div(lp, self.lp_total_supply)?,
            self.reserve1.mul_div(lp, self.lp_total_supply)?,
        ))
    }
}

/// A farming (fair-launch) contract and its pools.
#[derive(Debug, Clone, PartialEq)]
pub struct Farm {
    pub address: Address,
    pub kind: FarmKind,
    pub pools: Vec<FarmPool>,
}

impl Farm {
    pub fn pool(&self, pid: Pid) -> Option<&FarmPool> {
        self.pools.iter().find(|p| p.pid == pid)
    }

    /// All token addresses whose prices are needed to value this farm.
    pub fn priced_tokens(&self) -> Vec<Address> {
        let mut tokens: Vec<Address> = self
            .pools
            .iter()
            .flat_map(|p| {
                [p.token0.address, p.token1.address]
                    .into_iter()
                    .chain(p.reward_tokens.iter().map(|t| t.address))
            })
            .collect();
        tokens.sort();
        tokens.dedup();
        tokens
    }
}

/// A concentrated-liquidity position NFT owned by (or deposited for) the user.
///
/// `amount0`/`amount1` are the token amounts backing `liquidity` at the
/// current pool price, as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NftPosition {
    pub nft_id: NftId,
    pub pool_address: Address,
    pub liquidity: U256,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: TokenAmount,
    pub amount1: TokenAmount,
}

impl NftPosition {
    /// Same position restricted to `liquidity`, amounts scaled proportionally.
    pub fn with_liquidity(&self, liquidity: U256) -> Result<NftPosition, FarmError> {
        amm_helpers::ensure!(liquidity <= self.liquidity, FarmError::StakedExceedsTotal);
        let (amount0, amount1) = if self.liquidity.is_zero() {
            (self.amount0, self.amount1)
        } else {
            (
                self.amount0.mul_div(liquidity, self.liquidity)?,
                self.amount1.mul_div(liquidity, self.liquidity)?,
            )
        };
        Ok(NftPosition {
            liquidity,
            amount0,
            amount1,
            ..self.clone()
        })
    }

    pub fn usd<P: PriceOracle + ?Sized>(&self, prices: &P) -> f64 {
        self.amount0.usd(prices) + self.amount1.usd(prices)
    }

    /// `tick_lower <= current_tick < tick_upper`.
    pub fn is_in_range(&self, current_tick: i32) -> bool {
        current_tick >= self.tick_lower && current_tick < self.tick_upper
    }

    pub fn is_closed(&self) -> bool {
        self.liquidity.is_zero()
    }
}

/// Liquidity of a deposited NFT that is staked (joined) into pool `pid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinedPosition {
    pub nft_id: NftId,
    pub pid: Pid,
    pub liquidity: U256,
}

/// A deposited position split into its staked and still-available parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakedPosition {
    pub position: NftPosition,
    pub staked: U256,
    pub available: U256,
}

impl StakedPosition {
    pub fn new(position: NftPosition, staked: U256) -> Result<Self, FarmError> {
        let available = position
            .liquidity
            .checked_sub(staked)
            .ok_or(FarmError::StakedExceedsTotal)?;
        Ok(StakedPosition {
            position,
            staked,
            available,
        })
    }

    pub fn nft_id(&self) -> NftId {
        self.position.nft_id
    }

    pub fn available_position(&self) -> Result<NftPosition, FarmError> {
        self.position.with_liquidity(self.available)
    }

    pub fn staked_position(&self) -> Result<NftPosition, FarmError> {
        self.position.with_liquidity(self.staked)
    }
}

/// LP tokens of a classic pool: held in the wallet and staked in the farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpPosition {
    pub wallet: TokenAmount,
    pub staked: TokenAmount,
    /// ERC-20 allowance granted to the farm.
    pub allowance: U256,
}

impl LpPosition {
    pub fn new(lp_token: &Token, wallet: impl Into<U256>, staked: impl Into<U256>) -> Self {
        LpPosition {
            wallet: TokenAmount::new(lp_token, wallet),
            staked: TokenAmount::new(lp_token, staked),
            allowance: U256::zero(),
        }
    }
}

/// Per-farm, per-user state.
///
/// Elastic farms fill the NFT fields, classic farms `lp_positions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFarmInfo {
    pub deposited_positions: Vec<NftPosition>,
    pub joined_positions: BTreeMap<Pid, Vec<JoinedPosition>>,
    pub reward_pendings: BTreeMap<Pid, Vec<Reward>>,
    pub lp_positions: BTreeMap<Pid, LpPosition>,
}

impl UserFarmInfo {
    pub fn deposited_in_pool(&self, pool_address: Address) -> Vec<&NftPosition> {
        self.deposited_positions
            .iter()
            .filter(|p| p.pool_address == pool_address)
            .collect()
    }

    pub fn joined_in_pool(&self, pid: Pid) -> &[JoinedPosition] {
        self.joined_positions
            .get(&pid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_deposited(&self, nft_id: NftId) -> bool {
        self.deposited_positions.iter().any(|p| p.nft_id == nft_id)
    }

    pub fn deposited(&self, nft_id: NftId) -> Option<&NftPosition> {
        self.deposited_positions.iter().find(|p| p.nft_id == nft_id)
    }

    /// Liquidity of `nft_id` staked in pool `pid`.
    pub fn staked_liquidity(&self, pid: Pid, nft_id: NftId) -> U256 {
        self.joined_in_pool(pid)
            .iter()
            .find(|j| j.nft_id == nft_id)
            .map(|j| j.liquidity)
            .unwrap_or_default()
    }

    /// Staked liquidity of `nft_id` in whichever pool it is joined to.
    pub fn staked_liquidity_anywhere(&self, nft_id: NftId) -> U256 {
        self.joined_positions
            .values()
            .flatten()
            .find(|j| j.nft_id == nft_id && !j.liquidity.is_zero())
            .map(|j| j.liquidity)
            .unwrap_or_default()
    }

    /// Pool the NFT is joined to, if any.
    pub fn pid_of(&self, nft_id: NftId) -> Option<Pid> {
        self.joined_positions
            .iter()
            .find(|(_, joined)| joined.iter().any(|j| j.nft_id == nft_id))
            .map(|(pid, _)| *pid)
    }

    /// Deposited positions of one pool split into staked / available liquidity.
    pub fn staked_positions(
        &self,
        pid: Pid,
        pool_address: Address,
    ) -> Result<Vec<StakedPosition>, FarmError> {
        self.deposited_in_pool(pool_address)
            .into_iter()
            .map(|p| StakedPosition::new(p.clone(), self.staked_liquidity(pid, p.nft_id)))
            .collect()
    }

    pub fn lp_position(&self, pid: Pid) -> Option<&LpPosition> {
        self.lp_positions.get(&pid)
    }

    /// LP tokens staked in classic pool `pid`.
    pub fn staked_lp(&self, pid: Pid) -> U256 {
        self.lp_position(pid)
            .map(|lp| lp.staked.raw)
            .unwrap_or_default()
    }

    pub fn rewards_of(&self, pid: Pid) -> &[Reward] {
        self.reward_pendings
            .get(&pid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Result of the farm contract's `getRewardCalculationData(nftId, pid)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardCalculationData {
    /// Fraction of the target volume unlocked, scaled by `VESTING_VOLUME_PRECISION`.
    pub vesting_volume: U256,
    pub last_touched_time: Timestamp,
}

/// One full read of farm state for one account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmSnapshot {
    pub farms: Vec<Farm>,
    /// Keyed by farm address.
    pub user_farm_info: HashMap<Address, UserFarmInfo>,
    /// Cumulative pool fees (USD) as of 24h ago, keyed by pool address.
    pub pool_fee_last_24h: HashMap<Address, f64>,
    pub timestamp: Timestamp,
    pub block_number: BlockNumber,
}

impl FarmSnapshot {
    pub fn farm(&self, address: Address) -> Option<&Farm> {
        self.farms.iter().find(|f| f.address == address)
    }

    pub fn user_info(&self, farm: Address) -> Option<&UserFarmInfo> {
        self.user_farm_info.get(&farm)
    }
}
