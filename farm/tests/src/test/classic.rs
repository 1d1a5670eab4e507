use anyhow::Result;
use assert2::assert;
use farm_trait::{
    FarmError,
    FarmKind,
    TokenAmount,
};
use farm_view::{
    ActionError,
    ActionKind,
    FarmStatus,
};
use primitive_types::U256;

use crate::test::setup::{
    classic_chain_state,
    eth,
    knc,
    usdc,
    FarmTestSetup,
    FARM,
};

fn lp(whole: u64) -> U256 {
    U256::exp10(18) * U256::from(whole)
}

#[tokio::test]
async fn classic_pool_values_wallet_lp() -> Result<()> {
    let mut setup = FarmTestSetup::new(classic_chain_state(100)).await?;

    let pool = setup.pool_view(0).await?;
    assert!(pool.kind == FarmKind::Classic);
    assert!(pool.can_stake);
    assert!(!pool.can_unstake);
    // 100 of 1_000 LP in a $400_000 pool
    assert!((pool.amount_can_stake_usd - 40_000.0).abs() < 1e-6);
    assert!(pool.staked_usd == 0.0);
    // 0.01 KNC/s at $2 over a year against $400_000
    assert!((pool.farm_apr - 157.68).abs() < 1e-6);
    Ok(())
}

#[tokio::test]
async fn stake_and_unstake_lp_amounts() -> Result<()> {
    let mut setup = FarmTestSetup::new(classic_chain_state(100)).await?;
    let pool = setup.pool_view(0).await?;

    let rejected = setup
        .actions
        .deposit_lp(&pool, &setup.user().await?, FarmStatus::Active, lp(40))
        .await;
    assert!(rejected == Err(ActionError::InvalidInput(FarmError::NotApproved)));

    setup.actions.approve_lp(&pool).await?;
    assert!(setup.actions.state().is_pending(ActionKind::ApproveLp));
    setup.mine().await?;
    let allowance = setup.user().await?.lp_positions[&0].allowance;
    assert!(allowance == U256::MAX);

    let rejected = setup
        .actions
        .deposit_lp(&pool, &setup.user().await?, FarmStatus::Active, lp(101))
        .await;
    assert!(rejected == Err(ActionError::InvalidInput(FarmError::InsufficientBalance)));

    setup
        .actions
        .deposit_lp(&pool, &setup.user().await?, FarmStatus::Active, lp(40))
        .await?;
    setup.mine().await?;

    let user = setup.user().await?;
    assert!(user.staked_lp(0) == lp(40));
    assert!(user.lp_positions[&0].wallet.raw == lp(60));

    let pool = setup.pool_view(0).await?;
    assert!(pool.can_unstake);
    assert!((pool.staked_usd - 16_000.0).abs() < 1e-6);
    assert!(
        pool.staked_amounts
            == vec![
                TokenAmount::new(&eth(), lp(4)),
                TokenAmount::new(&usdc(), 8_000_000_000u64),
            ]
    );
    let group = setup.views().await?.remove(0);
    assert!(group.can_withdraw);
    assert!((group.deposited_usd - 16_000.0).abs() < 1e-6);

    let rejected = setup.actions.withdraw_lp(&pool, &user, lp(41)).await;
    assert!(rejected == Err(ActionError::InvalidInput(FarmError::InsufficientBalance)));
    setup.actions.withdraw_lp(&pool, &user, lp(40)).await?;
    setup.mine().await?;

    let user = setup.user().await?;
    assert!(user.staked_lp(0).is_zero());
    assert!(user.lp_positions[&0].wallet.raw == lp(100));
    Ok(())
}

#[tokio::test]
async fn harvest_single_classic_pool() -> Result<()> {
    let mut state = classic_chain_state(0);
    let reward = TokenAmount::new(&knc(), lp(3));
    if let Some(alice) = state.users.get_mut(&FARM) {
        alice.reward_pendings.insert(0, vec![reward]);
    }
    let mut setup = FarmTestSetup::new(state).await?;

    let pool = setup.pool_view(0).await?;
    assert!(pool.can_harvest);
    assert!(!pool.can_stake);

    let snapshot = setup.snapshot().await?;
    let farm = snapshot.farm(FARM).expect("farm is listed");
    setup
        .actions
        .harvest(farm, &setup.user().await?, Some(0))
        .await?;
    setup.mine().await?;

    let claimed = setup.chain.state().await.claimed.clone();
    assert!(claimed == vec![reward]);
    assert!(!setup.pool_view(0).await?.can_harvest);
    Ok(())
}
