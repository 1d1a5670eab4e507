use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    sync::Arc,
};

use anyhow::{
    anyhow,
    Result,
};
use farm_trait::{
    Address,
    Farm,
    FarmDataSource,
    FarmKind,
    FarmPool,
    FarmSchedule,
    FarmSnapshot,
    JoinedPosition,
    LpPosition,
    NftPosition,
    Pid,
    Token,
    TokenAmount,
    UserFarmInfo,
};
use farm_view::{
    build_farm_views,
    views::load_vesting_data,
    FarmActions,
    FarmGroupView,
    FarmViewConfig,
    PoolView,
    PositionMemo,
    VestingData,
};
use primitive_types::U256;

use crate::chain::{
    ChainState,
    InMemoryChain,
};

pub const ALICE: Address = Address([0xa1; 20]);
pub const BOB: Address = Address([0xb0; 20]);
pub const FARM: Address = Address([0xfa; 20]);
pub const POSITION_MANAGER: Address = Address([0xee; 20]);

/// ETH/USDC, fee target set, 5% reward APR.
pub const POOL_A: Address = Address([0x0a; 20]);
/// ETH/USDC, 8% reward APR.
pub const POOL_B: Address = Address([0x0b; 20]);
/// KNC/DAI.
pub const POOL_C: Address = Address([0x0c; 20]);

pub const FARM_START: u64 = 1_000;
pub const FARM_END: u64 = FARM_START + 30 * 86_400;
pub const NOW: u64 = 2_000;

pub fn set_up_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn eth() -> Token {
    Token::new(Address([1; 20]), "ETH", "Ether", 18)
}

pub fn usdc() -> Token {
    Token::new(Address([2; 20]), "USDC", "USD Coin", 6)
}

pub fn knc() -> Token {
    Token::new(Address([3; 20]), "KNC", "Kyber Network Crystal", 18)
}

pub fn dai() -> Token {
    Token::new(Address([4; 20]), "DAI", "Dai Stablecoin", 18)
}

pub fn prices() -> HashMap<Address, f64> {
    HashMap::from([
        (eth().address, 2_000.0),
        (usdc().address, 1.0),
        (knc().address, 2.0),
        (dai().address, 1.0),
    ])
}

fn pool(pid: Pid, pool_address: Address, token0: Token, token1: Token, apr: f64) -> FarmPool {
    let mut pool = FarmPool::new(
        pid,
        pool_address,
        token0,
        token1,
        40,
        FarmSchedule::Timestamp {
            start: FARM_START,
            end: FARM_END,
        },
    );
    pool.reward_tokens = vec![knc()];
    pool.apr = Some(apr);
    pool
}

pub fn farm() -> Farm {
    let mut with_target = pool(0, POOL_A, eth(), usdc(), 5.0);
    with_target.fee_target = U256::exp10(20);
    Farm {
        address: FARM,
        kind: FarmKind::Elastic,
        pools: vec![
            with_target,
            pool(1, POOL_B, eth(), usdc(), 8.0),
            pool(2, POOL_C, knc(), dai(), 20.0),
        ],
    }
}

/// `liquidity / 100` ETH plus `20 * liquidity` USDC, i.e. $40 per unit of liquidity.
pub fn position(nft_id: u64, pool_address: Address, liquidity: u64) -> NftPosition {
    NftPosition {
        nft_id: nft_id.into(),
        pool_address,
        liquidity: liquidity.into(),
        tick_lower: -600,
        tick_upper: 600,
        amount0: TokenAmount::new(&eth(), U256::exp10(16) * U256::from(liquidity)),
        amount1: TokenAmount::new(&usdc(), U256::from(20_000_000u64) * U256::from(liquidity)),
    }
}

pub fn joined(nft_id: u64, pid: Pid, liquidity: u64) -> JoinedPosition {
    JoinedPosition {
        nft_id: nft_id.into(),
        pid,
        liquidity: liquidity.into(),
    }
}

/// Chain state with `user` as ALICE's position in [`farm`], approved.
pub fn chain_state(user: UserFarmInfo) -> ChainState {
    ChainState {
        farms: vec![farm()],
        users: HashMap::from([(FARM, user)]),
        approvals: [(ALICE, FARM)].into(),
        timestamp: NOW,
        block_number: 100,
        ..Default::default()
    }
}

pub fn user(deposited: Vec<NftPosition>, joined: Vec<JoinedPosition>) -> UserFarmInfo {
    let mut joined_positions: BTreeMap<Pid, Vec<JoinedPosition>> = BTreeMap::new();
    for j in joined {
        joined_positions.entry(j.pid).or_default().push(j);
    }
    UserFarmInfo {
        deposited_positions: deposited,
        joined_positions,
        reward_pendings: BTreeMap::new(),
        lp_positions: BTreeMap::new(),
    }
}

/// Classic ETH/USDC pool at [`POOL_A`]: 1_000 LP over 100 ETH + 200_000 USDC,
/// emitting 0.01 KNC per second.
pub fn classic_farm() -> Farm {
    let mut pool = pool(0, POOL_A, eth(), usdc(), 0.0);
    pool.apr = None;
    pool.lp_total_supply = U256::exp10(21);
    pool.reserve0 = TokenAmount::new(&eth(), U256::exp10(20));
    pool.reserve1 = TokenAmount::new(&usdc(), 200_000_000_000u64);
    pool.pool_tvl = 400_000.0;
    pool.reward_per_unit = vec![TokenAmount::new(&knc(), U256::exp10(16))];
    Farm {
        address: FARM,
        kind: FarmKind::Classic,
        pools: vec![pool],
    }
}

/// ALICE holds `wallet_lp` whole LP tokens of [`classic_farm`], none approved.
pub fn classic_chain_state(wallet_lp: u64) -> ChainState {
    let lp = classic_farm().pools[0].lp_token();
    let alice = UserFarmInfo {
        lp_positions: BTreeMap::from([(
            0,
            LpPosition::new(&lp, U256::exp10(18) * U256::from(wallet_lp), 0u8),
        )]),
        ..Default::default()
    };
    ChainState {
        farms: vec![classic_farm()],
        users: HashMap::from([(FARM, alice)]),
        timestamp: NOW,
        block_number: 100,
        ..Default::default()
    }
}

pub struct FarmTestSetup {
    pub chain: Arc<InMemoryChain>,
    pub actions: FarmActions<InMemoryChain>,
    pub config: FarmViewConfig,
    pub prices: HashMap<Address, f64>,
    memo: PositionMemo,
}

impl FarmTestSetup {
    /// ALICE connected to [`FARM`], approval read from the chain.
    pub async fn new(state: ChainState) -> Result<Self> {
        set_up_logger();
        let chain = Arc::new(InMemoryChain::new(ALICE, POSITION_MANAGER, state));
        let actions = FarmActions::new(FARM, POSITION_MANAGER, chain.clone()).with_account(ALICE);
        actions.refresh_approval(&*chain).await?;
        Ok(FarmTestSetup {
            chain,
            actions,
            config: FarmViewConfig::default(),
            prices: prices(),
            memo: PositionMemo::new(),
        })
    }

    pub async fn snapshot(&self) -> Result<FarmSnapshot> {
        Ok(self.chain.fetch(Some(ALICE)).await?)
    }

    pub async fn user(&self) -> Result<UserFarmInfo> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.user_info(FARM).cloned().unwrap_or_default())
    }

    /// Fetches, loads vesting data and builds every farm view.
    pub async fn views(&mut self) -> Result<Vec<FarmGroupView>> {
        let snapshot = self.snapshot().await?;
        let mut vesting = HashMap::new();
        for farm in &snapshot.farms {
            let data = match snapshot.user_info(farm.address) {
                Some(user) => load_vesting_data(&*self.chain, farm, user).await?,
                None => VestingData::new(),
            };
            vesting.insert(farm.address, data);
        }
        Ok(build_farm_views(
            &snapshot,
            &vesting,
            &self.prices,
            &self.config,
            &mut self.memo,
        )?)
    }

    pub async fn pool_view(&mut self, pid: Pid) -> Result<PoolView> {
        let views = self.views().await?;
        views
            .iter()
            .find(|v| v.address == FARM)
            .and_then(|v| v.pool(pid))
            .cloned()
            .ok_or_else(|| anyhow!("No pool {pid} in farm {FARM}"))
    }

    /// Mines queued transactions and settles the orchestrator's pending list.
    pub async fn mine(&self) -> Result<()> {
        self.chain.mine().await;
        self.actions.poll_pending().await;
        Ok(())
    }
}
