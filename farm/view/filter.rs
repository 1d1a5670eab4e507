use std::{
    collections::{
        BTreeSet,
        HashMap,
        HashSet,
    },
    fmt,
    str::FromStr,
};

use farm_trait::{
    Address,
    BlockNumber,
    Farm,
    FarmPool,
    FarmSchedule,
    FarmSnapshot,
    NftPosition,
    Timestamp,
    UserFarmInfo,
};

use crate::config::FarmViewConfig;

/// Which tab a pool belongs to. Always derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FarmStatus {
    #[default]
    Active,
    Ended,
}

impl FarmStatus {
    /// Active iff the end has not passed: `end >= now` for timestamp
    /// schedules, `end_block >= block_number` for block schedules.
    pub fn classify(schedule: &FarmSchedule, now: Timestamp, block_number: BlockNumber) -> Self {
        let active = match schedule {
            FarmSchedule::Timestamp { end, .. } => *end >= now,
            FarmSchedule::Block { end_block, .. } => *end_block >= block_number,
        };
        if active {
            FarmStatus::Active
        } else {
            FarmStatus::Ended
        }
    }

    /// Like [`FarmStatus::classify`], but extended pools stay active.
    pub fn of_pool(
        pool: &FarmPool,
        now: Timestamp,
        block_number: BlockNumber,
        config: &FarmViewConfig,
    ) -> Self {
        if config.is_extended(&pool.pool_address) {
            return FarmStatus::Active
        }
        Self::classify(&pool.schedule, now, block_number)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FarmStatus::Active => "active",
            FarmStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for FarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FarmStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FarmStatus::Active),
            "ended" => Ok(FarmStatus::Ended),
            _ => Err(()),
        }
    }
}

pub fn is_started(schedule: &FarmSchedule, now: Timestamp, block_number: BlockNumber) -> bool {
    match schedule {
        FarmSchedule::Timestamp { start, .. } => *start <= now,
        FarmSchedule::Block { start_block, .. } => *start_block <= block_number,
    }
}

/// Case-insensitive substring match on either token's symbol or name, or,
/// when `query` is an address, exact match on the pool or a token address.
pub fn matches_search(pool: &FarmPool, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true
    }
    if let Ok(address) = Address::parse(query) {
        return [
            pool.pool_address,
            pool.token0.address,
            pool.token1.address,
        ]
        .contains(&address)
    }
    let needle = query.to_lowercase();
    [&pool.token0, &pool.token1].iter().any(|token| {
        token.symbol.to_lowercase().contains(&needle)
            || token.name.to_lowercase().contains(&needle)
    })
}

/// The user has deposited or staked liquidity in `pool`, NFTs or LP tokens.
pub fn has_user_liquidity(pool: &FarmPool, user: Option<&UserFarmInfo>) -> bool {
    let Some(user) = user else {
        return false
    };
    !user.staked_lp(pool.pid).is_zero()
        || user
            .deposited_in_pool(pool.pool_address)
            .iter()
            .any(|p| !p.liquidity.is_zero())
        || user
            .joined_in_pool(pool.pid)
            .iter()
            .any(|j| !j.liquidity.is_zero())
}

/// Pool list selection taken from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmFilter {
    pub status: FarmStatus,
    pub search: String,
    pub staked_only: bool,
}

impl FarmFilter {
    pub fn matches(
        &self,
        pool: &FarmPool,
        user: Option<&UserFarmInfo>,
        now: Timestamp,
        block_number: BlockNumber,
        config: &FarmViewConfig,
    ) -> bool {
        FarmStatus::of_pool(pool, now, block_number, config) == self.status
            && matches_search(pool, &self.search)
            && (!self.staked_only || has_user_liquidity(pool, user))
    }

    /// Matching pools grouped by farm; farms left without pools are dropped.
    pub fn apply<'a>(
        &self,
        snapshot: &'a FarmSnapshot,
        config: &FarmViewConfig,
    ) -> Vec<(&'a Farm, Vec<&'a FarmPool>)> {
        snapshot
            .farms
            .iter()
            .filter_map(|farm| {
                let user = snapshot.user_info(farm.address);
                let pools: Vec<&FarmPool> = farm
                    .pools
                    .iter()
                    .filter(|pool| {
                        self.matches(pool, user, snapshot.timestamp, snapshot.block_number, config)
                    })
                    .collect();
                (!pools.is_empty()).then_some((farm, pools))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PositionRange {
    InRange,
    OutOfRange,
    #[default]
    All,
}

/// Addresses of the pools of `farm` that sit on the `status` tab.
pub fn valid_pool_addresses(
    farm: &Farm,
    status: FarmStatus,
    now: Timestamp,
    block_number: BlockNumber,
    config: &FarmViewConfig,
) -> BTreeSet<Address> {
    farm.pools
        .iter()
        .filter(|pool| FarmStatus::of_pool(pool, now, block_number, config) == status)
        .map(|pool| pool.pool_address)
        .collect()
}

/// Positions offered in the deposit/withdraw lists.
///
/// Closed positions are always dropped, as are positions outside
/// `valid_pools`. Range filters need the pool's current tick; positions
/// of pools with an unknown tick only pass [`PositionRange::All`].
pub fn filter_positions<'a>(
    positions: &'a [NftPosition],
    range: PositionRange,
    current_ticks: &HashMap<Address, i32>,
    valid_pools: &BTreeSet<Address>,
) -> Vec<&'a NftPosition> {
    positions
        .iter()
        .filter(|p| !p.is_closed() && valid_pools.contains(&p.pool_address))
        .filter(|p| match range {
            PositionRange::All => true,
            PositionRange::InRange => current_ticks
                .get(&p.pool_address)
                .map_or(false, |tick| p.is_in_range(*tick)),
            PositionRange::OutOfRange => current_ticks
                .get(&p.pool_address)
                .map_or(false, |tick| !p.is_in_range(*tick)),
        })
        .collect()
}

/// Active pools across all farms, one per `SYM0 - SYM1` pair (first wins).
pub fn unique_active_pools<'a>(
    snapshot: &'a FarmSnapshot,
    config: &FarmViewConfig,
) -> Vec<&'a FarmPool> {
    let mut seen = HashSet::new();
    snapshot
        .farms
        .iter()
        .flat_map(|farm| farm.pools.iter())
        .filter(|pool| {
            FarmStatus::of_pool(pool, snapshot.timestamp, snapshot.block_number, config)
                == FarmStatus::Active
        })
        .filter(|pool| seen.insert(pool.pair_key()))
        .collect()
}
