use anyhow::{
    anyhow,
    Result,
};
use assert2::assert;
use farm_trait::{
    RewardCalculationData,
    TokenAmount,
};
use farm_view::{
    orchestrator::harvest_totals,
    FarmQuery,
    FarmStatus,
    LiquiditySelection,
    SortField,
};
use primitive_types::U256;

use crate::test::setup::{
    chain_state,
    eth,
    joined,
    knc,
    position,
    user,
    FarmTestSetup,
    FARM,
    NOW,
    POOL_A,
    POOL_B,
};

fn vesting(fraction_e12: u64) -> RewardCalculationData {
    RewardCalculationData {
        vesting_volume: fraction_e12.into(),
        last_touched_time: NOW,
    }
}

#[tokio::test]
async fn target_volume_is_weighted_by_staked_liquidity() -> Result<()> {
    let mut state = chain_state(user(
        vec![position(1, POOL_A, 100), position(2, POOL_A, 300)],
        vec![joined(1, 0, 100), joined(2, 0, 300)],
    ));
    state.vesting.insert((FARM, 0, 1u8.into()), vesting(500_000_000_000));
    state.vesting.insert((FARM, 0, 2u8.into()), vesting(1_000_000_000_000));
    let mut setup = FarmTestSetup::new(state).await?;

    let pool = setup.pool_view(0).await?;
    let target = pool.target_volume.expect("fee target pool with vesting data");
    assert!((target.fraction - 0.875).abs() < 1e-12);
    assert!(target.label() == "87.50%");
    assert!(!target.is_fully_unlocked());
    assert!(pool.nft_target_volumes[1].1.is_fully_unlocked());

    // no fee target, no target volume
    let plain = setup.pool_view(1).await?;
    assert!(plain.target_volume == None);
    Ok(())
}

#[tokio::test]
async fn equal_deposits_sort_by_apr() -> Result<()> {
    let state = chain_state(user(
        vec![position(1, POOL_A, 25), position(2, POOL_B, 25)],
        vec![],
    ));
    let mut setup = FarmTestSetup::new(state).await?;

    let mut query = FarmQuery::default();
    query.toggle_sort(SortField::MyDeposit);
    let views = setup.views().await?;
    let mut pools = views[0].pools.clone();
    query.sort.sort(&mut pools);

    assert!(pools[0].deposited_usd == 1_000.0);
    assert!(pools[1].deposited_usd == 1_000.0);
    let pids: Vec<u32> = pools.iter().map(|p| p.pid).collect();
    assert!(pids == vec![1, 0, 2]);
    assert!(query.to_string() == "type=active&tab=elastic&orderBy=my_deposit&orderDirection=desc");
    Ok(())
}

#[tokio::test]
async fn harvest_sums_rewards_per_token() -> Result<()> {
    let mut alice = user(
        vec![position(1, POOL_A, 100), position(2, POOL_B, 100)],
        vec![joined(1, 0, 100), joined(2, 1, 100)],
    );
    alice.reward_pendings.insert(
        0,
        vec![TokenAmount::new(&knc(), 2u8), TokenAmount::new(&knc(), 3u8)],
    );
    alice
        .reward_pendings
        .insert(1, vec![TokenAmount::new(&eth(), 1u8)]);
    let mut setup = FarmTestSetup::new(chain_state(alice)).await?;

    let expected = vec![TokenAmount::new(&knc(), 5u8), TokenAmount::new(&eth(), 1u8)];
    let totals = harvest_totals(&setup.user().await?, None)?;
    assert!(totals == expected);

    let group = setup.views().await?.remove(0);
    assert!(group.can_harvest);
    assert!(group.rewards == expected);
    assert!((group.reward_usd - 2.01e-15).abs() < 1e-24);

    let snapshot = setup.snapshot().await?;
    let farm = snapshot.farm(FARM).expect("farm is listed");
    setup
        .actions
        .harvest(farm, &setup.user().await?, None)
        .await?;
    setup.mine().await?;

    let claimed = setup.chain.state().await.claimed.clone();
    assert!(claimed.len() == 3);
    let claimed = farm_view::math::aggregate_amounts(&claimed)
        .map_err(|e| anyhow!("Failed to sum claimed rewards: {e:?}"))?;
    assert!(claimed == expected);
    let group = setup.views().await?.remove(0);
    assert!(!group.can_harvest);
    Ok(())
}

#[tokio::test]
async fn search_matches_partial_symbol() -> Result<()> {
    let setup = FarmTestSetup::new(chain_state(user(vec![], vec![]))).await?;
    let snapshot = setup.snapshot().await?;

    let filter = FarmQuery::parse("?type=active&search=usd").filter(false);
    let found = filter.apply(&snapshot, &setup.config);
    assert!(found.len() == 1);
    let pids: Vec<u32> = found[0].1.iter().map(|p| p.pid).collect();
    assert!(pids == vec![0, 1]);

    let by_name = FarmQuery::parse("search=CRYSTAL").filter(false);
    let found = by_name.apply(&snapshot, &setup.config);
    assert!(found[0].1.iter().map(|p| p.pid).collect::<Vec<_>>() == vec![2]);

    let ended = FarmQuery::parse("type=ended&search=usd").filter(false);
    assert!(ended.apply(&snapshot, &setup.config).is_empty());
    Ok(())
}

#[tokio::test]
async fn staking_the_remaining_position() -> Result<()> {
    let mut state = chain_state(user(
        vec![position(1, POOL_A, 100), position(2, POOL_A, 50)],
        vec![joined(1, 0, 100)],
    ));
    state.vesting.insert((FARM, 0, 1u8.into()), vesting(250_000_000_000));
    let mut setup = FarmTestSetup::new(state).await?;
    assert!(setup.actions.is_approved());

    let before = setup.pool_view(0).await?;
    assert!(before.deposited_usd == 6_000.0);
    assert!(before.staked_usd == 4_000.0);
    assert!(before.amount_can_stake_usd == 2_000.0);
    assert!(before.can_stake);
    assert!(before.can_unstake);
    assert!(before.target_volume.map(|t| t.label()) == Some("25.00%".to_string()));

    let alice = setup.user().await?;
    setup
        .actions
        .stake(&before, &alice, FarmStatus::Active, &[LiquiditySelection::all(2u8.into())])
        .await?;
    assert!(setup.actions.state().pending.len() == 1);
    setup.mine().await?;
    assert!(setup.actions.state().pending.is_empty());
    assert!(setup.actions.error() == None);

    let alice = setup.user().await?;
    assert!(alice.staked_liquidity(0, 2u8.into()) == U256::from(50u8));

    // second position staked with no vesting progress yet
    let after = setup.pool_view(0).await?;
    assert!(after.deposited_usd == 6_000.0);
    assert!(after.staked_usd == 6_000.0);
    assert!(after.amount_can_stake_usd == 0.0);
    assert!(!after.can_stake);
    assert!(after.can_unstake);
    assert!(after.unstake_blocker() == None);
    let target = after.target_volume.expect("vesting read for both positions");
    assert!((target.fraction - 0.25 * 100.0 / 150.0).abs() < 1e-12);
    Ok(())
}

#[tokio::test]
async fn ended_farm_only_offers_exits() -> Result<()> {
    let state = chain_state(user(
        vec![position(1, POOL_A, 100), position(2, POOL_A, 100)],
        vec![joined(1, 0, 100)],
    ));
    let mut setup = FarmTestSetup::new(state).await?;
    setup.chain.advance_time(31 * 86_400).await;

    let group = setup.views().await?.remove(0);
    let pool = group.pool(0).expect("pid 0 is listed").clone();
    assert!(pool.status == FarmStatus::Ended);
    assert!(pool.amount_can_stake_usd == 0.0);
    assert!(pool.stake_blocker(true, FarmStatus::Ended).is_some());
    assert!(pool.unstake_blocker() == None);
    assert!(!group.needs_approval(false, FarmStatus::Ended));

    let alice = setup.user().await?;
    let staking = setup
        .actions
        .stake(&pool, &alice, FarmStatus::Ended, &[LiquiditySelection::all(2u8.into())])
        .await;
    assert!(staking.is_err());

    setup
        .actions
        .unstake(&pool, &alice, &[LiquiditySelection::all(1u8.into())])
        .await?;
    setup.mine().await?;
    setup.actions.withdraw(&setup.user().await?, &[1u8.into(), 2u8.into()]).await?;
    setup.mine().await?;

    let alice = setup.user().await?;
    assert!(alice.deposited_positions.is_empty());
    let wallet = setup.chain.state().await.wallet.clone();
    assert!(wallet.len() == 2);
    Ok(())
}
