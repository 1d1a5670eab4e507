use primitive_types::U256;

use crate::{
    Address,
    NftId,
    Pid,
};

/// A state-changing call on the position manager, an LP token or a farm contract.
///
/// The signer decides the on-wire ABI; the SCALE encoding is only used to
/// hand calls across process boundaries and in logs.
#[derive(Debug, Clone, PartialEq, Eq, scale::Encode, scale::Decode)]
pub enum FarmCall {
    /// Position manager: let `operator` move all of the caller's NFTs.
    SetApprovalForAll { operator: Address, approved: bool },
    /// Moves NFTs into the farm's custody.
    Deposit { nft_ids: Vec<NftId> },
    /// Returns deposited NFTs that are no longer staked.
    Withdraw { nft_ids: Vec<NftId> },
    /// Stakes `liqs[i]` of `nft_ids[i]` into pool `pid`.
    Join {
        pid: U256,
        nft_ids: Vec<NftId>,
        liqs: Vec<U256>,
    },
    /// Unstakes `liqs[i]` of `nft_ids[i]` from pool `pid`.
    Exit {
        pid: U256,
        nft_ids: Vec<NftId>,
        liqs: Vec<U256>,
    },
    /// Claims rewards of every `nft_ids[i]` in pool `pids[i]`.
    HarvestMultiplePools { nft_ids: Vec<NftId>, pids: Vec<U256> },
    /// Pulls NFTs out regardless of their staked state.
    EmergencyWithdraw { nft_ids: Vec<NftId> },
    /// ERC-20 `approve(spender, amount)` on a classic pool's LP token.
    Approve { spender: Address, amount: U256 },
    /// Classic farm: stakes `amount` LP tokens into pool `pid`.
    DepositAmount { pid: U256, amount: U256 },
    /// Classic farm: unstakes `amount` LP tokens from pool `pid`.
    WithdrawAmount { pid: U256, amount: U256 },
    /// Classic farm: claims the rewards of pool `pid`.
    Harvest { pid: U256 },
    /// Classic farm: claims the rewards of every listed pool.
    HarvestPools { pids: Vec<U256> },
}

impl FarmCall {
    pub fn join(pid: Pid, nft_ids: Vec<NftId>, liqs: Vec<U256>) -> Self {
        FarmCall::Join {
            pid: pid.into(),
            nft_ids,
            liqs,
        }
    }

    pub fn exit(pid: Pid, nft_ids: Vec<NftId>, liqs: Vec<U256>) -> Self {
        FarmCall::Exit {
            pid: pid.into(),
            nft_ids,
            liqs,
        }
    }

    pub fn harvest(items: impl IntoIterator<Item = (NftId, Pid)>) -> Self {
        let (nft_ids, pids) = items
            .into_iter()
            .map(|(nft_id, pid)| (nft_id, U256::from(pid)))
            .unzip();
        FarmCall::HarvestMultiplePools { nft_ids, pids }
    }

    pub fn deposit_amount(pid: Pid, amount: U256) -> Self {
        FarmCall::DepositAmount {
            pid: pid.into(),
            amount,
        }
    }

    pub fn withdraw_amount(pid: Pid, amount: U256) -> Self {
        FarmCall::WithdrawAmount {
            pid: pid.into(),
            amount,
        }
    }

    /// Contract method name.
    pub fn method(&self) -> &'static str {
        match self {
            FarmCall::SetApprovalForAll { .. } => "setApprovalForAll",
            FarmCall::Deposit { .. } => "deposit",
            FarmCall::Withdraw { .. } => "withdraw",
            FarmCall::Join { .. } => "join",
            FarmCall::Exit { .. } => "exit",
            FarmCall::HarvestMultiplePools { .. } => "harvestMultiplePools",
            FarmCall::EmergencyWithdraw { .. } => "emergencyWithdraw",
            FarmCall::Approve { .. } => "approve",
            FarmCall::DepositAmount { .. } => "deposit",
            FarmCall::WithdrawAmount { .. } => "withdraw",
            FarmCall::Harvest { .. } => "harvest",
            FarmCall::HarvestPools { .. } => "harvestMultiplePools",
        }
    }

    /// NFT ids touched by this call.
    pub fn nft_ids(&self) -> &[NftId] {
        match self {
            FarmCall::SetApprovalForAll { .. }
            | FarmCall::Approve { .. }
            | FarmCall::DepositAmount { .. }
            | FarmCall::WithdrawAmount { .. }
            | FarmCall::Harvest { .. }
            | FarmCall::HarvestPools { .. } => &[],
            FarmCall::Deposit { nft_ids }
            | FarmCall::Withdraw { nft_ids }
            | FarmCall::Join { nft_ids, .. }
            | FarmCall::Exit { nft_ids, .. }
            | FarmCall::HarvestMultiplePools { nft_ids, .. }
            | FarmCall::EmergencyWithdraw { nft_ids } => nft_ids,
        }
    }
}
