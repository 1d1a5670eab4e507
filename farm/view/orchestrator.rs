//! User actions on one farm: approve, deposit, stake, unstake, harvest,
//! withdraw and force-withdraw. Classic farms stake LP token amounts instead
//! of NFTs.
//!
//! Every action validates its input against the latest farm data, packages
//! the contract call and hands it to the [`TransactionSubmitter`]. Transient
//! state (open modal, in-flight submission, pending hashes, last error) is
//! published on a `watch` channel so any number of views can follow it.

use std::sync::Arc;

use amm_helpers::ensure;
use farm_trait::{
    Address,
    Farm,
    FarmCall,
    FarmError,
    FarmKind,
    FarmReader,
    NftId,
    NftPosition,
    Pid,
    Reward,
    StakedPosition,
    TransactionSubmitter,
    TxHash,
    TxStatus,
    UserFarmInfo,
};
use primitive_types::U256;
use scale::Encode;
use tokio::sync::watch;

use crate::{
    config::FarmViewConfig,
    error::ActionError,
    filter::FarmStatus,
    math,
    views::PoolView,
};

/// Which dialog of the farm is open. At most one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModalState {
    #[default]
    None,
    Deposit,
    Withdraw,
    ForcedWithdraw,
    Stake(Pid),
    Unstake(Pid),
    /// `None` harvests every pool of the farm.
    Harvest(Option<Pid>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Approve,
    /// LP token allowance of a classic farm.
    ApproveLp,
    Deposit,
    Withdraw,
    ForceWithdraw,
    Stake,
    Unstake,
    Harvest,
}

/// A broadcast transaction not yet seen mined or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionState {
    pub modal: ModalState,
    /// A submission is waiting for the wallet.
    pub attempting: bool,
    pub pending: Vec<PendingTx>,
    /// Last displayable failure. User rejections never land here.
    pub error: Option<ActionError>,
    /// Position manager approval of this farm, as last observed.
    pub approved: bool,
}

impl ActionState {
    pub fn is_pending(&self, kind: ActionKind) -> bool {
        self.pending.iter().any(|tx| tx.kind == kind)
    }
}

/// Liquidity to move for one position; `None` moves all of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquiditySelection {
    pub nft_id: NftId,
    pub liquidity: Option<U256>,
}

impl LiquiditySelection {
    pub fn all(nft_id: NftId) -> Self {
        LiquiditySelection {
            nft_id,
            liquidity: None,
        }
    }

    pub fn partial(nft_id: NftId, liquidity: U256) -> Self {
        LiquiditySelection {
            nft_id,
            liquidity: Some(liquidity),
        }
    }
}

/// Deposited positions of the pool with liquidity left to stake.
pub fn stakeable_positions(
    user: &UserFarmInfo,
    pid: Pid,
    pool_address: Address,
) -> Result<Vec<StakedPosition>, FarmError> {
    let mut positions = user.staked_positions(pid, pool_address)?;
    positions.retain(|p| !p.available.is_zero());
    Ok(positions)
}

/// Deposited positions of the pool with liquidity staked in `pid`.
pub fn unstakeable_positions(
    user: &UserFarmInfo,
    pid: Pid,
    pool_address: Address,
) -> Result<Vec<StakedPosition>, FarmError> {
    let mut positions = user.staked_positions(pid, pool_address)?;
    positions.retain(|p| !p.staked.is_zero());
    Ok(positions)
}

/// Deposited positions that can leave the farm: nothing staked anywhere.
pub fn withdrawable_positions(user: &UserFarmInfo) -> Vec<&NftPosition> {
    user.deposited_positions
        .iter()
        .filter(|p| user.staked_liquidity_anywhere(p.nft_id).is_zero())
        .collect()
}

/// Pending rewards in `scope`, summed per reward token.
pub fn harvest_totals(user: &UserFarmInfo, scope: Option<Pid>) -> Result<Vec<Reward>, FarmError> {
    let pending = user
        .reward_pendings
        .iter()
        .filter(|(pid, _)| scope.map_or(true, |scope| **pid == scope))
        .flat_map(|(_, rewards)| rewards);
    Ok(math::aggregate_amounts(pending)?)
}

/// Picks `(nft_ids, liqs)` out of per-position limits.
fn select_liquidity(
    user: &UserFarmInfo,
    pool_address: Address,
    selection: &[LiquiditySelection],
    limit: impl Fn(&StakedPosition) -> U256,
    pid: Pid,
) -> Result<(Vec<NftId>, Vec<U256>), FarmError> {
    let mut nft_ids = Vec::new();
    let mut liqs = Vec::new();
    for item in selection {
        if nft_ids.contains(&item.nft_id) {
            continue
        }
        let position = user
            .deposited(item.nft_id)
            .ok_or(FarmError::PositionNotDeposited)?;
        ensure!(position.pool_address == pool_address, FarmError::PoolNotFound);
        let split = StakedPosition::new(position.clone(), user.staked_liquidity(pid, item.nft_id))?;
        let max = limit(&split);
        let amount = match item.liquidity {
            None => max,
            Some(liquidity) => {
                ensure!(!liquidity.is_zero(), FarmError::ZeroAmount);
                ensure!(liquidity <= max, FarmError::StakedExceedsTotal);
                liquidity
            }
        };
        if !amount.is_zero() {
            nft_ids.push(item.nft_id);
            liqs.push(amount);
        }
    }
    Ok((nft_ids, liqs))
}

/// Resets `attempting` when the submission finishes or is dropped.
struct AttemptGuard<'a>(&'a watch::Sender<ActionState>);

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|state| state.attempting = false);
    }
}

/// Action orchestrator of one farm for the connected account.
pub struct FarmActions<S: ?Sized> {
    farm: Address,
    position_manager: Address,
    account: Option<Address>,
    submitter: Arc<S>,
    state: watch::Sender<ActionState>,
}

impl<S: TransactionSubmitter + ?Sized> FarmActions<S> {
    pub fn new(farm: Address, position_manager: Address, submitter: Arc<S>) -> Self {
        let (state, _) = watch::channel(ActionState::default());
        FarmActions {
            farm,
            position_manager,
            account: None,
            submitter,
            state,
        }
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn farm(&self) -> Address {
        self.farm
    }

    pub fn state(&self) -> ActionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionState> {
        self.state.subscribe()
    }

    pub fn modal(&self) -> ModalState {
        self.state.borrow().modal
    }

    pub fn is_attempting(&self) -> bool {
        self.state.borrow().attempting
    }

    pub fn is_approved(&self) -> bool {
        self.state.borrow().approved
    }

    pub fn error(&self) -> Option<ActionError> {
        self.state.borrow().error.clone()
    }

    pub fn open(&self, modal: ModalState) {
        self.state.send_modify(|state| {
            state.modal = modal;
            state.error = None;
        });
    }

    pub fn close(&self) {
        self.open(ModalState::None);
    }

    fn connected(&self) -> Result<Address, FarmError> {
        self.account.ok_or(FarmError::WalletNotConnected)
    }

    fn reject(&self, kind: ActionKind, e: FarmError) -> ActionError {
        log::debug!("{kind:?} on farm {} rejected: {e}", self.farm);
        ActionError::InvalidInput(e)
    }

    /// Re-reads the position manager approval of this farm.
    pub async fn refresh_approval(&self, reader: &dyn FarmReader) -> Result<bool, ActionError> {
        let Some(account) = self.account else {
            self.state.send_modify(|state| state.approved = false);
            return Ok(false)
        };
        match reader.is_approved_for_all(account, self.farm).await {
            Ok(approved) => {
                self.state.send_modify(|state| state.approved = approved);
                Ok(approved)
            }
            Err(e) => {
                log::warn!("Failed to read approval of farm {}: {e}", self.farm);
                Err(e.into())
            }
        }
    }

    async fn submit(
        &self,
        kind: ActionKind,
        to: Address,
        call: FarmCall,
    ) -> Result<TxHash, ActionError> {
        let mut busy = false;
        self.state.send_modify(|state| {
            busy = state.attempting;
            if !busy {
                state.attempting = true;
                state.error = None;
            }
        });
        if busy {
            return Err(ActionError::ActionInFlight)
        }
        let _attempt = AttemptGuard(&self.state);

        log::debug!(
            "Submitting {} to {to} for {kind:?} ({} bytes)",
            call.method(),
            call.encoded_size()
        );
        match self.submitter.submit(to, call).await {
            Ok(hash) => {
                log::debug!("{kind:?} broadcast as {hash}");
                self.state.send_modify(|state| {
                    state.pending.push(PendingTx { hash, kind });
                    state.modal = ModalState::None;
                });
                Ok(hash)
            }
            Err(e) => {
                let e = ActionError::from(e);
                if e.is_silent() {
                    log::debug!("{kind:?} on farm {} cancelled by user", self.farm);
                } else {
                    log::warn!("{kind:?} on farm {} failed: {e}", self.farm);
                    self.state.send_modify(|state| state.error = Some(e.clone()));
                }
                Err(e)
            }
        }
    }

    /// `setApprovalForAll(farm, true)` on the position manager.
    ///
    /// Returns `None` when already approved and the hash of the pending
    /// approval, without resubmitting, when one is in flight.
    pub async fn approve(&self) -> Result<Option<TxHash>, ActionError> {
        self.connected()
            .map_err(|e| self.reject(ActionKind::Approve, e))?;
        let existing = {
            let state = self.state.borrow();
            if state.approved {
                return Ok(None)
            }
            state
                .pending
                .iter()
                .find(|tx| tx.kind == ActionKind::Approve)
                .map(|tx| tx.hash)
        };
        if let Some(hash) = existing {
            return Ok(Some(hash))
        }
        let call = FarmCall::SetApprovalForAll {
            operator: self.farm,
            approved: true,
        };
        self.submit(ActionKind::Approve, self.position_manager, call)
            .await
            .map(Some)
    }

    /// Moves NFTs into the farm. Only positions not yet deposited qualify.
    pub async fn deposit(
        &self,
        user: &UserFarmInfo,
        nft_ids: &[NftId],
        tab: FarmStatus,
    ) -> Result<TxHash, ActionError> {
        let call = self
            .deposit_call(user, nft_ids, tab)
            .map_err(|e| self.reject(ActionKind::Deposit, e))?;
        self.submit(ActionKind::Deposit, self.farm, call).await
    }

    fn deposit_call(
        &self,
        user: &UserFarmInfo,
        nft_ids: &[NftId],
        tab: FarmStatus,
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        ensure!(self.is_approved(), FarmError::NotApproved);
        ensure!(tab == FarmStatus::Active, FarmError::FarmEnded);
        let mut ids: Vec<NftId> = Vec::with_capacity(nft_ids.len());
        for id in nft_ids {
            ensure!(!user.is_deposited(*id), FarmError::PositionAlreadyDeposited);
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ensure!(!ids.is_empty(), FarmError::ZeroAmount);
        Ok(FarmCall::Deposit { nft_ids: ids })
    }

    /// `join(pid, nftIds, liqs)` with the unstaked liquidity of each selected position.
    pub async fn stake(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        tab: FarmStatus,
        selection: &[LiquiditySelection],
    ) -> Result<TxHash, ActionError> {
        let call = self
            .stake_call(pool, user, tab, selection)
            .map_err(|e| self.reject(ActionKind::Stake, e))?;
        self.submit(ActionKind::Stake, self.farm, call).await
    }

    fn stake_call(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        tab: FarmStatus,
        selection: &[LiquiditySelection],
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        ensure!(pool.farm == self.farm, FarmError::PoolNotFound);
        if let Some(e) = pool.stake_blocker(self.is_approved(), tab) {
            return Err(e)
        }
        let (nft_ids, liqs) = select_liquidity(
            user,
            pool.pool_address,
            selection,
            |p| p.available,
            pool.pid,
        )?;
        ensure!(!nft_ids.is_empty(), FarmError::NothingToStake);
        Ok(FarmCall::join(pool.pid, nft_ids, liqs))
    }

    /// `exit(pid, nftIds, liqs)`; without an explicit amount the whole staked
    /// liquidity of a position is removed.
    pub async fn unstake(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        selection: &[LiquiditySelection],
    ) -> Result<TxHash, ActionError> {
        let call = self
            .unstake_call(pool, user, selection)
            .map_err(|e| self.reject(ActionKind::Unstake, e))?;
        self.submit(ActionKind::Unstake, self.farm, call).await
    }

    fn unstake_call(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        selection: &[LiquiditySelection],
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        ensure!(pool.farm == self.farm, FarmError::PoolNotFound);
        let (nft_ids, liqs) =
            select_liquidity(user, pool.pool_address, selection, |p| p.staked, pool.pid)?;
        ensure!(!nft_ids.is_empty(), FarmError::NothingToUnstake);
        Ok(FarmCall::exit(pool.pid, nft_ids, liqs))
    }

    /// `harvestMultiplePools` over every joined position in `scope`.
    pub async fn harvest(
        &self,
        farm: &Farm,
        user: &UserFarmInfo,
        scope: Option<Pid>,
    ) -> Result<TxHash, ActionError> {
        let call = self
            .harvest_call(farm, user, scope)
            .map_err(|e| self.reject(ActionKind::Harvest, e))?;
        self.submit(ActionKind::Harvest, self.farm, call).await
    }

    fn harvest_call(
        &self,
        farm: &Farm,
        user: &UserFarmInfo,
        scope: Option<Pid>,
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        ensure!(farm.address == self.farm, FarmError::PoolNotFound);
        if let Some(pid) = scope {
            ensure!(farm.pool(pid).is_some(), FarmError::PoolNotFound);
        }
        let totals = harvest_totals(user, scope)?;
        ensure!(totals.iter().any(|t| !t.is_zero()), FarmError::NothingToClaim);

        if farm.kind == FarmKind::Classic {
            let pids: Vec<U256> = farm
                .pools
                .iter()
                .filter(|pool| scope.map_or(true, |pid| pool.pid == pid))
                .filter(|pool| user.rewards_of(pool.pid).iter().any(|r| !r.is_zero()))
                .map(|pool| U256::from(pool.pid))
                .collect();
            return Ok(match scope {
                Some(pid) => FarmCall::Harvest { pid: pid.into() },
                None => FarmCall::HarvestPools { pids },
            })
        }

        let items: Vec<(NftId, Pid)> = farm
            .pools
            .iter()
            .filter(|pool| scope.map_or(true, |pid| pool.pid == pid))
            .flat_map(|pool| {
                user.joined_in_pool(pool.pid)
                    .iter()
                    .map(move |joined| (joined.nft_id, pool.pid))
            })
            .collect();
        ensure!(!items.is_empty(), FarmError::NothingToClaim);
        Ok(FarmCall::harvest(items))
    }

    fn classic_pool(&self, pool: &PoolView) -> Result<(), FarmError> {
        ensure!(
            pool.farm == self.farm && pool.kind == FarmKind::Classic,
            FarmError::PoolNotFound
        );
        Ok(())
    }

    /// ERC-20 `approve(farm, MAX)` on the LP token of a classic pool.
    pub async fn approve_lp(&self, pool: &PoolView) -> Result<TxHash, ActionError> {
        let call = self
            .approve_lp_call(pool)
            .map_err(|e| self.reject(ActionKind::ApproveLp, e))?;
        self.submit(ActionKind::ApproveLp, pool.pool_address, call).await
    }

    fn approve_lp_call(&self, pool: &PoolView) -> Result<FarmCall, FarmError> {
        self.connected()?;
        self.classic_pool(pool)?;
        Ok(FarmCall::Approve {
            spender: self.farm,
            amount: U256::MAX,
        })
    }

    /// `deposit(pid, amount)`: stakes LP tokens from the wallet.
    pub async fn deposit_lp(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        tab: FarmStatus,
        amount: U256,
    ) -> Result<TxHash, ActionError> {
        let call = self
            .deposit_lp_call(pool, user, tab, amount)
            .map_err(|e| self.reject(ActionKind::Stake, e))?;
        self.submit(ActionKind::Stake, self.farm, call).await
    }

    fn deposit_lp_call(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        tab: FarmStatus,
        amount: U256,
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        self.classic_pool(pool)?;
        ensure!(
            tab == FarmStatus::Active && pool.status == FarmStatus::Active,
            FarmError::FarmEnded
        );
        ensure!(!amount.is_zero(), FarmError::ZeroAmount);
        let lp = user
            .lp_position(pool.pid)
            .ok_or(FarmError::InsufficientBalance)?;
        ensure!(amount <= lp.wallet.raw, FarmError::InsufficientBalance);
        ensure!(amount <= lp.allowance, FarmError::NotApproved);
        Ok(FarmCall::deposit_amount(pool.pid, amount))
    }

    /// `withdraw(pid, amount)`: unstakes LP tokens back to the wallet.
    /// Allowed after the pool has ended.
    pub async fn withdraw_lp(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        amount: U256,
    ) -> Result<TxHash, ActionError> {
        let call = self
            .withdraw_lp_call(pool, user, amount)
            .map_err(|e| self.reject(ActionKind::Unstake, e))?;
        self.submit(ActionKind::Unstake, self.farm, call).await
    }

    fn withdraw_lp_call(
        &self,
        pool: &PoolView,
        user: &UserFarmInfo,
        amount: U256,
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        self.classic_pool(pool)?;
        ensure!(!amount.is_zero(), FarmError::ZeroAmount);
        ensure!(
            amount <= user.staked_lp(pool.pid),
            FarmError::InsufficientBalance
        );
        Ok(FarmCall::withdraw_amount(pool.pid, amount))
    }

    /// Returns deposited NFTs. Each must have no staked liquidity left.
    pub async fn withdraw(
        &self,
        user: &UserFarmInfo,
        nft_ids: &[NftId],
    ) -> Result<TxHash, ActionError> {
        let call = self
            .withdraw_call(user, nft_ids)
            .map_err(|e| self.reject(ActionKind::Withdraw, e))?;
        self.submit(ActionKind::Withdraw, self.farm, call).await
    }

    fn withdraw_call(&self, user: &UserFarmInfo, nft_ids: &[NftId]) -> Result<FarmCall, FarmError> {
        self.connected()?;
        ensure!(!nft_ids.is_empty(), FarmError::NothingToWithdraw);
        ensure!(self.is_approved(), FarmError::NotApproved);
        let mut ids: Vec<NftId> = Vec::with_capacity(nft_ids.len());
        for id in nft_ids {
            ensure!(user.is_deposited(*id), FarmError::PositionNotDeposited);
            ensure!(
                user.staked_liquidity_anywhere(*id).is_zero(),
                FarmError::PositionStillStaked
            );
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        Ok(FarmCall::Withdraw { nft_ids: ids })
    }

    /// `emergencyWithdraw` of every deposited NFT listed as affected by a farm issue.
    pub async fn force_withdraw(
        &self,
        user: &UserFarmInfo,
        config: &FarmViewConfig,
    ) -> Result<TxHash, ActionError> {
        let call = self
            .force_withdraw_call(user, config)
            .map_err(|e| self.reject(ActionKind::ForceWithdraw, e))?;
        self.submit(ActionKind::ForceWithdraw, self.farm, call).await
    }

    fn force_withdraw_call(
        &self,
        user: &UserFarmInfo,
        config: &FarmViewConfig,
    ) -> Result<FarmCall, FarmError> {
        self.connected()?;
        let nft_ids: Vec<NftId> = user
            .deposited_positions
            .iter()
            .map(|p| p.nft_id)
            .filter(|id| config.is_failed_nft(id))
            .collect();
        ensure!(!nft_ids.is_empty(), FarmError::NothingToWithdraw);
        Ok(FarmCall::EmergencyWithdraw { nft_ids })
    }

    /// Asks the submitter about every pending transaction and drops the
    /// settled ones. A failure becomes the stored error; a mined approval
    /// marks the farm approved. Returns what settled.
    pub async fn poll_pending(&self) -> Vec<(PendingTx, TxStatus)> {
        let pending = self.state.borrow().pending.clone();
        let mut settled = Vec::new();
        for tx in pending {
            match self.submitter.status(tx.hash).await {
                Ok(TxStatus::Pending) => {}
                Ok(status) => settled.push((tx, status)),
                Err(e) => log::warn!("Failed to read status of {}: {e}", tx.hash),
            }
        }
        if settled.is_empty() {
            return settled
        }
        self.state.send_modify(|state| {
            for (tx, status) in &settled {
                state.pending.retain(|p| p.hash != tx.hash);
                match status {
                    TxStatus::Mined => {
                        log::info!("{:?} {} mined", tx.kind, tx.hash);
                        if tx.kind == ActionKind::Approve {
                            state.approved = true;
                        }
                    }
                    TxStatus::Failed(reason) => {
                        log::warn!("{:?} {} failed: {reason}", tx.kind, tx.hash);
                        state.error = Some(ActionError::Reverted(reason.clone()));
                    }
                    TxStatus::Pending => {}
                }
            }
        });
        settled
    }
}
