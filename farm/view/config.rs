use std::{
    collections::BTreeSet,
    env,
    fmt,
    str::FromStr,
    time::Duration,
};

use amm_helpers::constants::{
    DEFAULT_BLOCKS_PER_YEAR,
    MAX_ALLOW_APR,
    VESTING_VOLUME_PRECISION,
};
use farm_trait::{
    Address,
    NftId,
};
use primitive_types::U256;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub const MAX_ALLOW_APR_VAR: &str = "FARM_MAX_ALLOW_APR";
pub const POLL_INTERVAL_VAR: &str = "FARM_POLL_INTERVAL_SECS";
pub const FAILED_NFTS_VAR: &str = "FARM_FAILED_NFTS";
pub const EXTENDED_POOLS_VAR: &str = "FARM_EXTENDED_POOLS";
pub const BLOCKS_PER_YEAR_VAR: &str = "FARM_BLOCKS_PER_YEAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable `name` holds an unparsable `value`.
    InvalidVar { name: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidVar { name, value } => {
                write!(f, "Failed to parse env var {name}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Reads and parses an environment variable; `Ok(None)` when unset.
pub fn get_env<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::InvalidVar {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(None),
    }
}

/// Parses a comma-separated list, ignoring empty items.
fn parse_list<T: FromStr>(name: &str, raw: &str) -> Result<Vec<T>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse().map_err(|_| ConfigError::InvalidVar {
                name: name.to_string(),
                value: item.to_string(),
            })
        })
        .collect()
}

/// Settings shared by the view model, the orchestrator and the poller.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmViewConfig {
    /// Trading-fee APR (percent) at or above which the figure is ignored.
    pub max_allow_apr: f64,
    pub vesting_volume_precision: U256,
    /// NFTs stuck in a farm with a known contract issue; eligible for force-withdraw.
    pub failed_nfts: BTreeSet<NftId>,
    /// Pools that stay on the active tab past their end.
    pub extended_pools: BTreeSet<Address>,
    pub poll_interval: Duration,
    /// Token priced in place of the zero address in reward lists.
    pub native_token: Address,
    /// Annualizes block-scheduled emissions.
    pub blocks_per_year: f64,
}

impl Default for FarmViewConfig {
    fn default() -> Self {
        FarmViewConfig {
            max_allow_apr: MAX_ALLOW_APR,
            vesting_volume_precision: U256::from(VESTING_VOLUME_PRECISION),
            failed_nfts: BTreeSet::new(),
            extended_pools: BTreeSet::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            native_token: Address::ZERO,
            blocks_per_year: DEFAULT_BLOCKS_PER_YEAR,
        }
    }
}

impl FarmViewConfig {
    pub fn with_max_allow_apr(mut self, max_allow_apr: f64) -> Self {
        self.max_allow_apr = max_allow_apr;
        self
    }

    pub fn with_failed_nfts(mut self, nfts: impl IntoIterator<Item = NftId>) -> Self {
        self.failed_nfts.extend(nfts);
        self
    }

    pub fn with_extended_pools(mut self, pools: impl IntoIterator<Item = Address>) -> Self {
        self.extended_pools.extend(pools);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_native_token(mut self, native_token: Address) -> Self {
        self.native_token = native_token;
        self
    }

    pub fn with_blocks_per_year(mut self, blocks_per_year: f64) -> Self {
        self.blocks_per_year = blocks_per_year;
        self
    }

    /// Defaults overridden by whatever `FARM_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(apr) = get_env::<f64>(MAX_ALLOW_APR_VAR)? {
            config.max_allow_apr = apr;
        }
        if let Some(secs) = get_env::<u64>(POLL_INTERVAL_VAR)? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(blocks) = get_env::<f64>(BLOCKS_PER_YEAR_VAR)? {
            config.blocks_per_year = blocks;
        }
        if let Some(raw) = get_env::<String>(FAILED_NFTS_VAR)? {
            let ids: Vec<u128> = parse_list(FAILED_NFTS_VAR, &raw)?;
            config.failed_nfts.extend(ids.into_iter().map(NftId::from));
        }
        if let Some(raw) = get_env::<String>(EXTENDED_POOLS_VAR)? {
            config
                .extended_pools
                .extend(parse_list::<Address>(EXTENDED_POOLS_VAR, &raw)?);
        }
        Ok(config)
    }

    pub fn is_failed_nft(&self, nft_id: &NftId) -> bool {
        self.failed_nfts.contains(nft_id)
    }

    pub fn is_extended(&self, pool_address: &Address) -> bool {
        self.extended_pools.contains(pool_address)
    }
}
