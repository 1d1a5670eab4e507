use anyhow::{
    bail,
    Result,
};
use assert2::assert;
use farm_trait::{
    FarmError,
    RpcError,
};
use farm_view::{
    ActionError,
    ActionKind,
    FarmStatus,
    FarmViewConfig,
    LiquiditySelection,
    ModalState,
};
use primitive_types::U256;

use crate::test::setup::{
    chain_state,
    joined,
    position,
    user,
    FarmTestSetup,
    ALICE,
    FARM,
    POOL_A,
    POOL_B,
};

#[tokio::test]
async fn approve_then_deposit() -> Result<()> {
    let mut state = chain_state(user(vec![], vec![]));
    state.approvals.clear();
    state.wallet = vec![position(7, POOL_A, 100), position(8, POOL_B, 100)];
    let mut setup = FarmTestSetup::new(state).await?;

    let group = setup.views().await?.remove(0);
    assert!(group.needs_approval(setup.actions.is_approved(), FarmStatus::Active));
    assert!(
        group.deposit_blocker(true, setup.actions.is_approved(), FarmStatus::Active)
            == Some(FarmError::NotApproved)
    );

    let hash = setup.actions.approve().await?;
    assert!(hash.is_some());
    assert!(setup.actions.state().is_pending(ActionKind::Approve));
    setup.mine().await?;
    assert!(setup.actions.is_approved());
    let approvals = setup.chain.state().await.approvals.clone();
    assert!(approvals.contains(&(ALICE, FARM)));

    setup.actions.open(ModalState::Deposit);
    setup
        .actions
        .deposit(&setup.user().await?, &[7u8.into(), 8u8.into()], FarmStatus::Active)
        .await?;
    assert!(setup.actions.modal() == ModalState::None);
    setup.mine().await?;

    let group = setup.views().await?.remove(0);
    assert!(group.can_withdraw);
    assert!(group.deposited_usd == 8_000.0);
    assert!(group.pool(0).map(|p| p.can_stake) == Some(true));
    assert!(group.pool(1).map(|p| p.can_stake) == Some(true));
    let wallet = setup.chain.state().await.wallet.clone();
    assert!(wallet.is_empty());
    Ok(())
}

#[tokio::test]
async fn rejected_signature_is_silent() -> Result<()> {
    let state = chain_state(user(vec![position(1, POOL_A, 100)], vec![]));
    let mut setup = FarmTestSetup::new(state).await?;
    let pool = setup.pool_view(0).await?;

    setup.actions.open(ModalState::Stake(0));
    setup.chain.fail_next_submit(RpcError::from_code(4001, "User denied")).await;
    let result = setup
        .actions
        .stake(
            &pool,
            &setup.user().await?,
            FarmStatus::Active,
            &[LiquiditySelection::all(1u8.into())],
        )
        .await;

    assert!(result == Err(ActionError::UserRejected));
    assert!(setup.actions.error() == None);
    assert!(!setup.actions.is_attempting());
    // the modal stays open for another try
    assert!(setup.actions.modal() == ModalState::Stake(0));
    assert!(setup.actions.state().pending.is_empty());
    Ok(())
}

#[tokio::test]
async fn network_failure_is_stored_and_cleared_on_retry() -> Result<()> {
    let state = chain_state(user(vec![position(1, POOL_A, 100)], vec![]));
    let setup = FarmTestSetup::new(state).await?;
    let alice = setup.user().await?;

    setup.chain.fail_next_submit(RpcError::from_code(-32000, "header not found")).await;
    let result = setup.actions.withdraw(&alice, &[1u8.into()]).await;
    assert!(result == Err(ActionError::Network("header not found".to_string())));
    assert!(setup.actions.error() == result.err());
    assert!(!setup.actions.is_attempting());

    setup.actions.withdraw(&alice, &[1u8.into()]).await?;
    assert!(setup.actions.error() == None);
    setup.mine().await?;
    let alice = setup.user().await?;
    assert!(alice.deposited_positions.is_empty());
    Ok(())
}

#[tokio::test]
async fn revert_on_chain_is_reported_after_mining() -> Result<()> {
    let state = chain_state(user(vec![], vec![]));
    let setup = FarmTestSetup::new(state).await?;

    // not in the wallet: passes local checks, reverts on chain
    setup
        .actions
        .deposit(&setup.user().await?, &[42u8.into()], FarmStatus::Active)
        .await?;
    assert!(setup.actions.error() == None);
    setup.mine().await?;

    let Some(ActionError::Reverted(reason)) = setup.actions.error() else {
        bail!("Expected the deposit to revert")
    };
    assert!(reason.contains("not owned"));
    assert!(setup.actions.state().pending.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_input_never_reaches_the_chain() -> Result<()> {
    let state = chain_state(user(
        vec![position(1, POOL_A, 100), position(2, POOL_B, 100)],
        vec![joined(1, 0, 60)],
    ));
    let mut setup = FarmTestSetup::new(state).await?;
    let alice = setup.user().await?;
    let pool = setup.pool_view(0).await?;

    let too_much = [LiquiditySelection::partial(1u8.into(), U256::from(41u8))];
    let result = setup.actions.stake(&pool, &alice, FarmStatus::Active, &too_much).await;
    assert!(result == Err(ActionError::InvalidInput(FarmError::StakedExceedsTotal)));

    let zero = [LiquiditySelection::partial(1u8.into(), U256::zero())];
    let result = setup.actions.stake(&pool, &alice, FarmStatus::Active, &zero).await;
    assert!(result == Err(ActionError::InvalidInput(FarmError::ZeroAmount)));

    let result = setup.actions.withdraw(&alice, &[1u8.into()]).await;
    assert!(result == Err(ActionError::InvalidInput(FarmError::PositionStillStaked)));

    let snapshot = setup.snapshot().await?;
    let result = setup.actions.harvest(&snapshot.farms[0], &alice, None).await;
    assert!(result == Err(ActionError::InvalidInput(FarmError::NothingToClaim)));

    let mined = setup.chain.mine().await;
    assert!(mined == 0);
    assert!(setup.actions.error() == None);
    Ok(())
}

#[tokio::test]
async fn force_withdraw_recovers_affected_positions() -> Result<()> {
    let state = chain_state(user(
        vec![position(1, POOL_A, 100), position(2, POOL_A, 100)],
        vec![joined(1, 0, 100), joined(2, 0, 100)],
    ));
    let mut setup = FarmTestSetup::new(state).await?;
    setup.config = FarmViewConfig::default().with_failed_nfts([U256::from(2u8)]);

    let group = setup.views().await?.remove(0);
    assert!(group.has_affected_by_farm_issue);
    assert!(group.pool(0).map(|p| p.is_affected_by_farm_issue) == Some(true));

    setup.actions.open(ModalState::ForcedWithdraw);
    setup
        .actions
        .force_withdraw(&setup.user().await?, &setup.config)
        .await?;
    setup.mine().await?;

    let alice = setup.user().await?;
    assert!(!alice.is_deposited(2u8.into()));
    assert!(alice.is_deposited(1u8.into()));
    assert!(alice.staked_liquidity(0, 1u8.into()) == U256::from(100u8));
    let group = setup.views().await?.remove(0);
    assert!(!group.has_affected_by_farm_issue);
    Ok(())
}
