use std::{
    sync::Arc,
    time::Duration,
};

use anyhow::{
    anyhow,
    Result,
};
use assert2::assert;
use farm_trait::FarmSnapshot;
use farm_view::{
    FarmStatus,
    LiquiditySelection,
    Poller,
};
use primitive_types::U256;
use tokio::sync::{
    mpsc,
    watch,
};

use crate::test::setup::{
    chain_state,
    joined,
    position,
    user,
    FarmTestSetup,
    ALICE,
    BOB,
    FARM,
    POOL_A,
};

async fn next_snapshot(
    rx: &mut watch::Receiver<Option<Arc<FarmSnapshot>>>,
) -> Result<Arc<FarmSnapshot>> {
    rx.changed().await?;
    let snapshot = rx.borrow().clone();
    snapshot.ok_or_else(|| anyhow!("Poller published no snapshot"))
}

#[tokio::test(start_paused = true)]
async fn new_blocks_refresh_the_snapshot() -> Result<()> {
    let state = chain_state(user(
        vec![position(1, POOL_A, 100), position(2, POOL_A, 100)],
        vec![joined(1, 0, 100)],
    ));
    let mut setup = FarmTestSetup::new(state).await?;
    let poller = Poller::new(setup.chain.clone(), Some(ALICE), setup.config.poll_interval);
    let mut snapshots = poller.subscribe();
    let (blocks, blocks_rx) = mpsc::channel(16);
    let task = tokio::spawn(poller.run(blocks_rx));

    let first = next_snapshot(&mut snapshots).await?;
    assert!(first.block_number == 100);

    let pool = setup.pool_view(0).await?;
    let alice = first.user_info(FARM).cloned().unwrap_or_default();
    setup
        .actions
        .stake(&pool, &alice, FarmStatus::Active, &[LiquiditySelection::all(2u8.into())])
        .await?;
    setup.chain.mine().await;
    blocks.send(101).await?;

    let second = next_snapshot(&mut snapshots).await?;
    assert!(second.block_number == 101);
    let alice = second.user_info(FARM).cloned().unwrap_or_default();
    assert!(alice.staked_liquidity_anywhere(2u8.into()) == U256::from(100u8));

    drop(blocks);
    task.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn other_accounts_see_no_positions() -> Result<()> {
    let state = chain_state(user(vec![position(1, POOL_A, 100)], vec![]));
    let setup = FarmTestSetup::new(state).await?;
    let poller = Poller::new(setup.chain.clone(), Some(BOB), Duration::from_secs(5));

    let snapshot = poller.refresh().await?;
    assert!(snapshot.farms.len() == 1);
    assert!(snapshot.user_info(FARM).is_none());

    let disconnected = Poller::new(setup.chain.clone(), None, Duration::from_secs(5));
    let snapshot = disconnected.refresh().await?;
    assert!(snapshot.user_farm_info.is_empty());
    Ok(())
}
