mod address;
mod calls;
mod types;

use std::{
    collections::HashMap,
    fmt,
};

use amm_helpers::math::MathError;
use async_trait::async_trait;

pub use address::{
    Address,
    TxHash,
};
pub use calls::FarmCall;
pub use types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
pub enum FarmError {
    InvalidAddress,
    WalletNotConnected,
    StakedExceedsTotal,
    NothingToStake,
    NothingToUnstake,
    NothingToWithdraw,
    NothingToClaim,
    PositionNotDeposited,
    PositionAlreadyDeposited,
    PositionStillStaked,
    PoolNotFound,
    FarmNotStarted,
    FarmEnded,
    NotApproved,
    ZeroAmount,
    InsufficientBalance,
    ArithmeticError(MathError),
}

impl From<MathError> for FarmError {
    fn from(e: MathError) -> Self {
        FarmError::ArithmeticError(e)
    }
}

impl fmt::Display for FarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FarmError::InvalidAddress => write!(f, "Invalid address"),
            FarmError::WalletNotConnected => write!(f, "Connect a wallet first"),
            FarmError::StakedExceedsTotal => {
                write!(f, "Staked liquidity exceeds position liquidity")
            }
            FarmError::NothingToStake => write!(f, "No liquidity available to stake"),
            FarmError::NothingToUnstake => write!(f, "No staked liquidity to unstake"),
            FarmError::NothingToWithdraw => write!(f, "No position to withdraw"),
            FarmError::NothingToClaim => write!(f, "No rewards to harvest"),
            FarmError::PositionNotDeposited => write!(f, "Position is not deposited"),
            FarmError::PositionAlreadyDeposited => write!(f, "Position is already deposited"),
            FarmError::PositionStillStaked => write!(f, "Unstake the position before withdrawing"),
            FarmError::PoolNotFound => write!(f, "Pool not found"),
            FarmError::FarmNotStarted => write!(f, "Farm has not started"),
            FarmError::FarmEnded => write!(f, "Farm has ended"),
            FarmError::NotApproved => write!(f, "Farm is not approved"),
            FarmError::ZeroAmount => write!(f, "Amount must be greater than zero"),
            FarmError::InsufficientBalance => write!(f, "Insufficient balance"),
            FarmError::ArithmeticError(e) => write!(f, "Arithmetic error: {e:?}"),
        }
    }
}

impl std::error::Error for FarmError {}

/// Failure reported by the wallet or the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The user dismissed the signature request.
    UserRejected,
    Reverted(String),
    Network(String),
}

impl RpcError {
    /// EIP-1193 `userRejectedRequest`.
    pub const USER_REJECTED_CODE: i64 = 4001;
    /// JSON-RPC `execution reverted`.
    pub const REVERTED_CODE: i64 = 3;

    /// Classifies a JSON-RPC error by code.
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        match code {
            Self::USER_REJECTED_CODE => RpcError::UserRejected,
            Self::REVERTED_CODE => RpcError::Reverted(message.into()),
            _ => RpcError::Network(message.into()),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::UserRejected => write!(f, "Transaction rejected"),
            RpcError::Reverted(reason) => write!(f, "Transaction reverted: {reason}"),
            RpcError::Network(reason) => write!(f, "Network error: {reason}"),
        }
    }
}

impl std::error::Error for RpcError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Mined,
    Failed(String),
}

/// Signs and broadcasts calls on behalf of the connected account.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submits `call` to contract `to`, returning once the transaction is broadcast.
    async fn submit(&self, to: Address, call: FarmCall) -> Result<TxHash, RpcError>;

    /// Current status of a previously submitted transaction.
    async fn status(&self, hash: TxHash) -> Result<TxStatus, RpcError>;
}

/// Read-only contract queries.
#[async_trait]
pub trait FarmReader: Send + Sync {
    /// Position manager `isApprovedForAll(owner, operator)`.
    async fn is_approved_for_all(&self, owner: Address, operator: Address)
        -> Result<bool, RpcError>;

    /// Farm `getRewardCalculationData(nftId, pid)`.
    async fn reward_calculation_data(
        &self,
        farm: Address,
        nft_id: NftId,
        pid: Pid,
    ) -> Result<RewardCalculationData, RpcError>;
}

/// Loads farm, position and fee data for an account (or none, when disconnected).
#[async_trait]
pub trait FarmDataSource: Send + Sync {
    async fn fetch(&self, account: Option<Address>) -> Result<FarmSnapshot, RpcError>;
}

/// USD price lookup.
pub trait PriceOracle {
    /// Price of one whole token; `0.0` when unknown.
    fn price(&self, token: &Address) -> f64;
}

impl PriceOracle for HashMap<Address, f64> {
    fn price(&self, token: &Address) -> f64 {
        self.get(token).copied().unwrap_or_default()
    }
}
