/// The all-zero EVM address.
/// Used as a stand-in account when no wallet is connected and to denote
/// the native token in reward-token lists.
pub const ZERO_ADDRESS: [u8; 20] = [0u8; 20];

/// Vesting volume returned by `getRewardCalculationData` is scaled by this factor.
/// A position with `vesting_volume == VESTING_VOLUME_PRECISION` has fully
/// unlocked its target volume.
pub const VESTING_VOLUME_PRECISION: u128 = 1_000_000_000_000;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;

pub const DAYS_PER_YEAR: f64 = 365.0;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Blocks per year assumed for block-scheduled farms (13s blocks).
pub const DEFAULT_BLOCKS_PER_YEAR: f64 = SECONDS_PER_YEAR as f64 / 13.0;

/// Trading-fee APR (in percent) above which the figure is considered
/// an outlier and left out of the blended APR.
pub const MAX_ALLOW_APR: f64 = 2_000.0;
