//! Display state of a farm and its pools.
//!
//! Views are rebuilt from a fresh [`FarmSnapshot`] on every poll. The only
//! thing carried between builds is the [`PositionMemo`], which caches the
//! token amounts of partially staked positions.

use std::{
    collections::HashMap,
    fmt,
};

use farm_trait::{
    Address,
    BlockNumber,
    Farm,
    FarmError,
    FarmKind,
    FarmPool,
    FarmReader,
    FarmSchedule,
    FarmSnapshot,
    LpPosition,
    NftId,
    NftPosition,
    Pid,
    PriceOracle,
    Reward,
    RewardCalculationData,
    RpcError,
    StakedPosition,
    Timestamp,
    Token,
    TokenAmount,
    UserFarmInfo,
};
use amm_helpers::math::ratio_to_f64;
use primitive_types::U256;

use crate::{
    config::FarmViewConfig,
    filter::{
        is_started,
        FarmStatus,
    },
    format::format_duration,
    math::{
        self,
        TargetVolume,
    },
    memo::Memo,
    sort::SortState,
};

/// `getRewardCalculationData` results keyed by `(pid, nft_id)`.
pub type VestingData = HashMap<(Pid, NftId), RewardCalculationData>;

/// Cached `NftPosition::with_liquidity`, keyed by `(position, liquidity)`.
pub type PositionMemo = Memo<(NftPosition, U256), NftPosition>;

/// Price lookup that prices the zero address as the chain's native token.
#[derive(Clone, Copy)]
pub struct NativePrices<'a> {
    oracle: &'a dyn PriceOracle,
    native_token: Address,
}

impl<'a> NativePrices<'a> {
    pub fn new(oracle: &'a dyn PriceOracle, native_token: Address) -> Self {
        NativePrices {
            oracle,
            native_token,
        }
    }
}

impl PriceOracle for NativePrices<'_> {
    fn price(&self, token: &Address) -> f64 {
        if *token == Address::ZERO {
            self.oracle.price(&self.native_token)
        } else {
            self.oracle.price(token)
        }
    }
}

/// Everything besides farm and user data that a view depends on.
#[derive(Clone, Copy)]
pub struct ViewContext<'a> {
    pub now: Timestamp,
    pub block_number: BlockNumber,
    pub prices: NativePrices<'a>,
    pub config: &'a FarmViewConfig,
    /// Cumulative pool fees (USD) 24h ago, keyed by pool address.
    pub pool_fee_last_24h: &'a HashMap<Address, f64>,
}

impl<'a> ViewContext<'a> {
    pub fn new(
        snapshot: &'a FarmSnapshot,
        prices: &'a dyn PriceOracle,
        config: &'a FarmViewConfig,
    ) -> Self {
        ViewContext {
            now: snapshot.timestamp,
            block_number: snapshot.block_number,
            prices: NativePrices::new(prices, config.native_token),
            config,
            pool_fee_last_24h: &snapshot.pool_fee_last_24h,
        }
    }
}

/// Countdown shown next to a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLabel {
    /// Seconds until start.
    StartingIn(u64),
    /// Seconds until end.
    EndingIn(u64),
    StartingInBlocks(u64),
    EndingInBlocks(u64),
    Ended,
}

impl TimeLabel {
    pub fn new(schedule: &FarmSchedule, now: Timestamp, block_number: BlockNumber) -> Self {
        match *schedule {
            FarmSchedule::Timestamp { start, end } => {
                if start > now {
                    TimeLabel::StartingIn(start - now)
                } else if end >= now {
                    TimeLabel::EndingIn(end - now)
                } else {
                    TimeLabel::Ended
                }
            }
            FarmSchedule::Block {
                start_block,
                end_block,
            } => {
                if start_block > block_number {
                    TimeLabel::StartingInBlocks(start_block - block_number)
                } else if end_block >= block_number {
                    TimeLabel::EndingInBlocks(end_block - block_number)
                } else {
                    TimeLabel::Ended
                }
            }
        }
    }
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLabel::StartingIn(secs) => write!(f, "Starting in {}", format_duration(*secs)),
            TimeLabel::EndingIn(secs) => write!(f, "Ending in {}", format_duration(*secs)),
            TimeLabel::StartingInBlocks(blocks) => write!(f, "Starting in {blocks} blocks"),
            TimeLabel::EndingInBlocks(blocks) => write!(f, "Ending in {blocks} blocks"),
            TimeLabel::Ended => write!(f, "Ended"),
        }
    }
}

fn scaled(
    memo: &mut PositionMemo,
    position: &NftPosition,
    liquidity: U256,
) -> Result<NftPosition, FarmError> {
    if liquidity == position.liquidity {
        return Ok(position.clone())
    }
    memo.get_or_try_insert_with((position.clone(), liquidity), |(p, l)| p.with_liquidity(*l))
}

fn position_amounts<'a>(
    positions: impl IntoIterator<Item = &'a NftPosition>,
) -> impl Iterator<Item = &'a TokenAmount> {
    positions
        .into_iter()
        .flat_map(|p| [&p.amount0, &p.amount1])
}

fn is_positive(amounts: &[TokenAmount]) -> bool {
    amounts.iter().any(|a| !a.is_zero())
}

/// One row of a farm's pool table.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolView {
    pub farm: Address,
    pub pid: Pid,
    pub pool_address: Address,
    pub token0: Token,
    pub token1: Token,
    pub fee_tier: u32,
    pub kind: FarmKind,
    pub status: FarmStatus,
    pub is_started: bool,
    /// End timestamp (or block), the end-time sort key.
    pub end: u64,
    pub time_label: TimeLabel,
    pub staked_tvl: f64,
    pub farm_apr: f64,
    pub pool_apr: f64,
    /// Classic pool APR at or above this is left out of [`PoolView::apr`].
    pub apr_cap: f64,
    /// USD value of the user's positions deposited in this pool ("My Deposit").
    pub deposited_usd: f64,
    pub staked_usd: f64,
    /// Deposited but not yet staked, in USD. Zero once the pool has ended.
    pub amount_can_stake_usd: f64,
    pub deposited_amounts: Vec<TokenAmount>,
    pub staked_amounts: Vec<TokenAmount>,
    /// Pending rewards, one entry per reward token.
    pub rewards: Vec<Reward>,
    pub reward_usd: f64,
    /// `None` without a fee target, without staked liquidity, or while vesting data is missing.
    pub target_volume: Option<TargetVolume>,
    pub nft_target_volumes: Vec<(NftId, TargetVolume)>,
    /// Wallet and staked LP balances; classic pools of a connected user only.
    pub lp: Option<LpPosition>,
    pub can_stake: bool,
    pub can_unstake: bool,
    pub can_harvest: bool,
    pub is_affected_by_farm_issue: bool,
}

/// The user's side of a pool row.
struct Holdings {
    deposited_amounts: Vec<TokenAmount>,
    staked_amounts: Vec<TokenAmount>,
    deposited_usd: f64,
    staked_usd: f64,
    /// Value the user could still stake, before the ended check.
    stakeable_usd: f64,
    target_volume: Option<TargetVolume>,
    nft_target_volumes: Vec<(NftId, TargetVolume)>,
    lp: Option<LpPosition>,
    can_stake: bool,
    can_unstake: bool,
    is_affected_by_farm_issue: bool,
}

impl Holdings {
    fn elastic(
        pool: &FarmPool,
        user: &UserFarmInfo,
        vesting: &VestingData,
        ctx: &ViewContext<'_>,
        memo: &mut PositionMemo,
    ) -> Result<Self, FarmError> {
        let positions: Vec<StakedPosition> = user.staked_positions(pool.pid, pool.pool_address)?;

        let staked: Vec<NftPosition> = positions
            .iter()
            .filter(|p| !p.staked.is_zero())
            .map(|p| scaled(memo, &p.position, p.staked))
            .collect::<Result<_, _>>()?;

        let deposited_amounts =
            math::aggregate_amounts(position_amounts(positions.iter().map(|p| &p.position)))?;
        let staked_amounts = math::aggregate_amounts(position_amounts(&staked))?;
        let deposited_usd = math::usd_value(&deposited_amounts, &ctx.prices);
        let staked_usd = math::usd_value(&staked_amounts, &ctx.prices);

        let (target_volume, nft_target_volumes) = if pool.has_fee_target() {
            PoolView::target_volumes(pool.pid, &positions, vesting, ctx.config)?
        } else {
            (None, Vec::new())
        };

        Ok(Holdings {
            deposited_amounts,
            staked_amounts,
            deposited_usd,
            staked_usd,
            stakeable_usd: (deposited_usd - staked_usd).max(0.0),
            target_volume,
            nft_target_volumes,
            lp: None,
            can_stake: positions.iter().any(|p| !p.available.is_zero()),
            can_unstake: user
                .joined_in_pool(pool.pid)
                .iter()
                .any(|j| !j.liquidity.is_zero()),
            is_affected_by_farm_issue: positions
                .iter()
                .any(|p| ctx.config.is_failed_nft(&p.nft_id())),
        })
    }

    /// LP value is the staked share of the pool's TVL; token legs are the
    /// same share of each reserve.
    fn classic(pool: &FarmPool, user: &UserFarmInfo) -> Result<Self, FarmError> {
        let lp = user.lp_position(pool.pid).copied();
        let (wallet, staked) = lp
            .map(|lp| (lp.wallet.raw, lp.staked.raw))
            .unwrap_or_default();
        let lp_usd = |amount: U256| -> Result<f64, FarmError> {
            if pool.lp_total_supply.is_zero() {
                return Ok(0.0)
            }
            Ok(ratio_to_f64(amount, pool.lp_total_supply)? * pool.pool_tvl)
        };

        let (amount0, amount1) = pool.lp_share(staked)?;
        let staked_amounts = vec![amount0, amount1];
        let staked_usd = lp_usd(staked)?;

        Ok(Holdings {
            deposited_amounts: staked_amounts.clone(),
            staked_amounts,
            deposited_usd: staked_usd,
            staked_usd,
            stakeable_usd: lp_usd(wallet)?,
            target_volume: None,
            nft_target_volumes: Vec::new(),
            lp,
            can_stake: !wallet.is_zero(),
            can_unstake: !staked.is_zero(),
            is_affected_by_farm_issue: false,
        })
    }
}

impl PoolView {
    pub fn build(
        farm: &Farm,
        pool: &FarmPool,
        user: Option<&UserFarmInfo>,
        vesting: &VestingData,
        ctx: &ViewContext<'_>,
        memo: &mut PositionMemo,
    ) -> Result<Self, FarmError> {
        let status = FarmStatus::of_pool(pool, ctx.now, ctx.block_number, ctx.config);

        let pool_apr = match farm.kind {
            FarmKind::Elastic => {
                math::pool_apr(pool, ctx.pool_fee_last_24h.get(&pool.pool_address).copied())
            }
            FarmKind::Classic => match pool.pool_apr {
                Some(apr) if apr != 0.0 => apr,
                _ => math::trading_fee_apr(pool.one_day_fee_usd.unwrap_or_default(), pool.pool_tvl),
            },
        };

        let empty = UserFarmInfo::default();
        let user = user.unwrap_or(&empty);
        let holdings = match farm.kind {
            FarmKind::Elastic => Holdings::elastic(pool, user, vesting, ctx, memo)?,
            FarmKind::Classic => Holdings::classic(pool, user)?,
        };

        let rewards = match user.rewards_of(pool.pid) {
            [] => pool.reward_tokens.iter().map(TokenAmount::zero).collect(),
            pending => math::aggregate_amounts(pending)?,
        };
        let reward_usd = math::usd_value(&rewards, &ctx.prices);

        let amount_can_stake_usd = match status {
            FarmStatus::Ended => 0.0,
            FarmStatus::Active => holdings.stakeable_usd,
        };

        Ok(PoolView {
            farm: farm.address,
            pid: pool.pid,
            pool_address: pool.pool_address,
            token0: pool.token0.clone(),
            token1: pool.token1.clone(),
            fee_tier: pool.fee_tier,
            kind: farm.kind,
            status,
            is_started: is_started(&pool.schedule, ctx.now, ctx.block_number),
            end: pool.schedule.end(),
            time_label: TimeLabel::new(&pool.schedule, ctx.now, ctx.block_number),
            staked_tvl: math::staked_tvl(pool, &ctx.prices),
            farm_apr: math::farm_apr(pool, &ctx.prices, ctx.config.blocks_per_year),
            pool_apr,
            apr_cap: ctx.config.max_allow_apr,
            deposited_usd: holdings.deposited_usd,
            staked_usd: holdings.staked_usd,
            amount_can_stake_usd,
            deposited_amounts: holdings.deposited_amounts,
            staked_amounts: holdings.staked_amounts,
            can_harvest: is_positive(&rewards),
            rewards,
            reward_usd,
            target_volume: holdings.target_volume,
            nft_target_volumes: holdings.nft_target_volumes,
            lp: holdings.lp,
            can_stake: holdings.can_stake,
            can_unstake: holdings.can_unstake,
            is_affected_by_farm_issue: holdings.is_affected_by_farm_issue,
        })
    }

    fn target_volumes(
        pid: Pid,
        positions: &[StakedPosition],
        vesting: &VestingData,
        config: &FarmViewConfig,
    ) -> Result<(Option<TargetVolume>, Vec<(NftId, TargetVolume)>), FarmError> {
        let precision = config.vesting_volume_precision;
        let mut weighted = Vec::new();
        let mut per_nft = Vec::new();
        let mut complete = true;
        for p in positions.iter().filter(|p| !p.staked.is_zero()) {
            match vesting.get(&(pid, p.nft_id())) {
                Some(data) => {
                    per_nft.push((
                        p.nft_id(),
                        math::position_target_volume(data.vesting_volume, precision)?,
                    ));
                    weighted.push((data.vesting_volume, p.staked));
                }
                None => complete = false,
            }
        }
        let total = if complete {
            math::target_volume(weighted, precision)?
        } else {
            None
        };
        Ok((total, per_nft))
    }

    /// Reward APR plus pool APR. Classic pools drop an outlier pool APR.
    pub fn apr(&self) -> f64 {
        match self.kind {
            FarmKind::Classic => math::total_apr(self.farm_apr, self.pool_apr, self.apr_cap),
            FarmKind::Elastic => self.farm_apr + self.pool_apr,
        }
    }

    pub fn pair(&self) -> String {
        format!("{} - {}", self.token0.symbol, self.token1.symbol)
    }

    /// Why the stake button is disabled, if it is.
    pub fn stake_blocker(&self, approved: bool, tab: FarmStatus) -> Option<FarmError> {
        if !approved {
            Some(FarmError::NotApproved)
        } else if tab == FarmStatus::Ended || self.status == FarmStatus::Ended {
            Some(FarmError::FarmEnded)
        } else if !self.is_started {
            Some(FarmError::FarmNotStarted)
        } else if !self.can_stake {
            Some(FarmError::NothingToStake)
        } else {
            None
        }
    }

    pub fn unstake_blocker(&self) -> Option<FarmError> {
        (!self.can_unstake).then_some(FarmError::NothingToUnstake)
    }

    pub fn harvest_blocker(&self, connected: bool) -> Option<FarmError> {
        if !connected {
            Some(FarmError::WalletNotConnected)
        } else if !self.can_harvest {
            Some(FarmError::NothingToClaim)
        } else {
            None
        }
    }
}

/// A farm with the user's totals across all of its pools.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmGroupView {
    pub address: Address,
    pub kind: FarmKind,
    pub deposited_usd: f64,
    pub deposited_amounts: Vec<TokenAmount>,
    pub rewards: Vec<Reward>,
    pub reward_usd: f64,
    pub can_harvest: bool,
    pub can_withdraw: bool,
    /// The user deposited an NFT listed as stuck; force-withdraw is offered.
    pub has_affected_by_farm_issue: bool,
    /// Sorted by pid, highest first.
    pub pools: Vec<PoolView>,
}

impl FarmGroupView {
    pub fn build(
        farm: &Farm,
        user: Option<&UserFarmInfo>,
        vesting: &VestingData,
        ctx: &ViewContext<'_>,
        memo: &mut PositionMemo,
    ) -> Result<Self, FarmError> {
        let mut pools = farm
            .pools
            .iter()
            .map(|pool| PoolView::build(farm, pool, user, vesting, ctx, memo))
            .collect::<Result<Vec<_>, _>>()?;
        SortState::default().sort(&mut pools);

        let empty = UserFarmInfo::default();
        let user = user.unwrap_or(&empty);

        let rewards = math::aggregate_amounts(user.reward_pendings.values().flatten())?;
        let reward_usd = math::usd_value(&rewards, &ctx.prices);
        let can_harvest = is_positive(&rewards);

        let group = match farm.kind {
            FarmKind::Elastic => {
                let deposited_amounts =
                    math::aggregate_amounts(position_amounts(&user.deposited_positions))?;
                FarmGroupView {
                    address: farm.address,
                    kind: farm.kind,
                    deposited_usd: math::usd_value(&deposited_amounts, &ctx.prices),
                    deposited_amounts,
                    rewards,
                    reward_usd,
                    can_harvest,
                    can_withdraw: !user.deposited_positions.is_empty(),
                    has_affected_by_farm_issue: user
                        .deposited_positions
                        .iter()
                        .any(|p| ctx.config.is_failed_nft(&p.nft_id)),
                    pools,
                }
            }
            FarmKind::Classic => FarmGroupView {
                address: farm.address,
                kind: farm.kind,
                deposited_usd: pools.iter().map(|p| p.deposited_usd).sum(),
                deposited_amounts: math::aggregate_amounts(
                    pools.iter().flat_map(|p| &p.deposited_amounts),
                )?,
                rewards,
                reward_usd,
                can_harvest,
                can_withdraw: pools.iter().any(|p| p.can_unstake),
                has_affected_by_farm_issue: false,
                pools,
            },
        };
        Ok(group)
    }

    pub fn pool(&self, pid: Pid) -> Option<&PoolView> {
        self.pools.iter().find(|p| p.pid == pid)
    }

    /// The approve button is shown.
    pub fn needs_approval(&self, approved: bool, tab: FarmStatus) -> bool {
        !approved && tab == FarmStatus::Active
    }

    pub fn deposit_blocker(
        &self,
        connected: bool,
        approved: bool,
        tab: FarmStatus,
    ) -> Option<FarmError> {
        if !connected {
            Some(FarmError::WalletNotConnected)
        } else if !approved {
            Some(FarmError::NotApproved)
        } else if tab == FarmStatus::Ended {
            Some(FarmError::FarmEnded)
        } else {
            None
        }
    }

    pub fn withdraw_blocker(&self, connected: bool, approved: bool) -> Option<FarmError> {
        if !connected {
            Some(FarmError::WalletNotConnected)
        } else if !self.can_withdraw {
            Some(FarmError::NothingToWithdraw)
        } else if !approved {
            Some(FarmError::NotApproved)
        } else {
            None
        }
    }

    pub fn harvest_all_blocker(&self, connected: bool) -> Option<FarmError> {
        if !connected {
            Some(FarmError::WalletNotConnected)
        } else if !self.can_harvest {
            Some(FarmError::NothingToClaim)
        } else {
            None
        }
    }
}

/// Views for every farm of the snapshot. Starts a new memo pass.
pub fn build_farm_views(
    snapshot: &FarmSnapshot,
    vesting: &HashMap<Address, VestingData>,
    prices: &dyn PriceOracle,
    config: &FarmViewConfig,
    memo: &mut PositionMemo,
) -> Result<Vec<FarmGroupView>, FarmError> {
    memo.next_pass();
    let ctx = ViewContext::new(snapshot, prices, config);
    let empty = VestingData::new();
    let views = snapshot
        .farms
        .iter()
        .map(|farm| {
            FarmGroupView::build(
                farm,
                snapshot.user_info(farm.address),
                vesting.get(&farm.address).unwrap_or(&empty),
                &ctx,
                memo,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!(
        "Built views for {} farms at block {} ({} cached positions)",
        views.len(),
        snapshot.block_number,
        memo.len()
    );
    Ok(views)
}

/// Reads vesting progress of every staked position in pools with a fee target.
pub async fn load_vesting_data(
    reader: &dyn FarmReader,
    farm: &Farm,
    user: &UserFarmInfo,
) -> Result<VestingData, RpcError> {
    let mut data = VestingData::new();
    for pool in farm.pools.iter().filter(|p| p.has_fee_target()) {
        for joined in user.joined_in_pool(pool.pid) {
            if joined.liquidity.is_zero() {
                continue
            }
            let result = reader
                .reward_calculation_data(farm.address, joined.nft_id, pool.pid)
                .await?;
            data.insert((pool.pid, joined.nft_id), result);
        }
    }
    Ok(data)
}
