mod common;

use common::*;
use solana_sdk::signature::Keypair;
use zap_sdk::{
    AddLiquidityParams, DepositParams, Error, MemorySink, OutcomeStatus, StakeParams, SwapParams,
    ZapClient, ZapConfig, ZapDirection, ZapStep, USDC_MINT,
};

fn client<W: zap_sdk::WalletSigner>(
    transport: MockTransport,
    wallet: W,
) -> ZapClient<MockTransport, W, MemorySink> {
    ZapClient::new(transport, wallet, MemorySink::new(), ZapConfig::default())
}

#[tokio::test]
async fn two_hop_zap_in_threads_each_output_into_the_next_step() {
    let pool = two_hop_pool();
    let farm = farm(&pool, 5);
    // swap-1 out, swap-2 out, LP out, stake out
    let session = ScriptedSession::new(&[8_000, 3_000, 500, 500]);
    let recorder = session.recorder();
    let client = client(MockTransport::new(), Keypair::new());

    let zap = client.zap_in(session, &farm, &pool, 10_000).await.unwrap();

    let expected = vec![
        ZapStep::Swap(SwapParams {
            protocol:     zap_sdk::Protocol::Jupiter,
            from_mint:    USDC_MINT,
            to_mint:      pool.token_a_mint,
            amount:       10_000,
            slippage_bps: 100,
        }),
        ZapStep::Swap(SwapParams {
            protocol:     zap_sdk::Protocol::Jupiter,
            from_mint:    pool.token_a_mint,
            to_mint:      pool.token_b_mint,
            amount:       4_000,
            slippage_bps: 100,
        }),
        ZapStep::AddLiquidity(AddLiquidityParams {
            protocol:        pool.protocol,
            pool_id:         pool.id,
            token_in_mint:   pool.token_b_mint,
            token_in_amount: 3_000,
        }),
        ZapStep::Stake(StakeParams {
            protocol:    farm.protocol,
            position_id: farm.id,
            version:     5,
        }),
    ];
    assert_eq!(*recorder.lock().unwrap(), expected);
    assert_eq!(zap.steps, expected);
    assert_eq!(zap.direction, ZapDirection::In);

    assert!(zap.report.all_confirmed());
    assert_eq!(zap.report.total, 2);
    assert_eq!(client.transport().sent().len(), 2);
    assert_eq!(client.sink().success_count(), 2);
    assert_eq!(client.sink().error_count(), 0);
}

#[tokio::test]
async fn failed_append_aborts_before_anything_is_sent() {
    let pool = two_hop_pool();
    let farm = farm(&pool, 5);
    let session = ScriptedSession::new(&[8_000, 3_000]).failing_at(2);
    let recorder = session.recorder();
    let client = client(MockTransport::new(), Keypair::new());

    let err = client.zap_in(session, &farm, &pool, 10_000).await.unwrap_err();

    assert!(matches!(err, Error::Gateway(_)));
    assert_eq!(recorder.lock().unwrap().len(), 2);

    assert_eq!(client.transport().blockhash_calls(), 0);
    assert!(client.transport().sent().is_empty());

    let notes = client.sink().notifications();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].is_error());
    assert_eq!(notes[0].message, "Zap failed");
}

#[tokio::test]
async fn vault_zap_in_through_canonical_leg_swaps_half_and_deposits() {
    let pool = usdc_pool();
    let vault = vault(&pool);
    let session = ScriptedSession::new(&[7_000, 900, 900]).with_bundles(1);
    let recorder = session.recorder();
    let client = client(MockTransport::new(), Keypair::new());

    client.zap_in(session, &vault, &pool, 10_001).await.unwrap();

    let steps = recorder.lock().unwrap().clone();
    assert_eq!(steps.len(), 3);
    assert!(matches!(
        &steps[0],
        ZapStep::Swap(SwapParams { amount: 5_000, from_mint, to_mint, .. })
            if *from_mint == USDC_MINT && *to_mint == pool.token_a_mint
    ));
    assert!(matches!(
        &steps[1],
        ZapStep::AddLiquidity(AddLiquidityParams { token_in_amount: 7_000, token_in_mint, .. })
            if *token_in_mint == pool.token_a_mint
    ));
    assert_eq!(
        steps[2],
        ZapStep::Deposit(DepositParams {
            protocol:       vault.protocol,
            vault_id:       vault.id,
            deposit_amount: 900,
        })
    );
}

#[tokio::test]
async fn disconnected_wallet_fails_before_any_append() {
    let pool = two_hop_pool();
    let farm = farm(&pool, 3);
    let session = ScriptedSession::new(&[1, 1, 1, 1]);
    let recorder = session.recorder();
    let client = client(MockTransport::new(), DisconnectedWallet);

    let err = client.zap_in(session, &farm, &pool, 10_000).await.unwrap_err();

    assert!(matches!(err, Error::WalletNotConnected));
    assert!(recorder.lock().unwrap().is_empty());
    assert_eq!(client.sink().error_count(), 1);
    assert_eq!(
        client.sink().notifications()[0].description.as_deref(),
        Some("Wallet not connected!")
    );
}

#[tokio::test]
async fn empty_pool_is_rejected_before_any_append() {
    let mut pool = two_hop_pool();
    pool.reserve_b = 0;
    let farm = farm(&pool, 3);
    let session = ScriptedSession::new(&[1, 1, 1, 1]);
    let recorder = session.recorder();
    let client = client(MockTransport::new(), Keypair::new());

    let err = client.zap_in(session, &farm, &pool, 10_000).await.unwrap_err();

    assert!(matches!(err, Error::NoLiquidity(id) if id == pool.id));
    assert!(recorder.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_without_bundles_is_an_error() {
    let pool = two_hop_pool();
    let farm = farm(&pool, 3);
    let session = ScriptedSession::new(&[8_000, 3_000, 500, 500]).with_bundles(0);
    let client = client(MockTransport::new(), Keypair::new());

    let err = client.zap_in(session, &farm, &pool, 10_000).await.unwrap_err();

    assert!(matches!(err, Error::EmptyBundleSet));
    assert_eq!(client.sink().error_count(), 1);
}

#[tokio::test]
async fn submission_failure_is_reported_not_returned() {
    let pool = two_hop_pool();
    let farm = farm(&pool, 5);
    let session = ScriptedSession::new(&[8_000, 3_000, 500, 500]).with_bundles(3);
    let client = client(MockTransport::new().failing_send(1), Keypair::new());

    let zap = client.zap_in(session, &farm, &pool, 10_000).await.unwrap();

    assert!(zap.report.is_partial());
    assert_eq!(zap.report.outcomes[0].status, OutcomeStatus::Confirmed);
    assert_eq!(zap.report.outcomes[1].status, OutcomeStatus::Failed);
    assert_eq!(zap.report.skipped(), 1);

    // One success, one "Transaction failed!", and no "Zap failed".
    let notes = client.sink().notifications();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].message, "Transaction failed!");
    assert!(notes.iter().all(|n| n.message != "Zap failed"));
}

#[tokio::test]
async fn canonical_token_a_swaps_half_straight_into_token_b() {
    let pool = usdc_first_pool();
    let farm = farm(&pool, 5);
    // swap out, LP out, stake out
    let session = ScriptedSession::new(&[7_000, 900, 900]);
    let recorder = session.recorder();
    let client = client(MockTransport::new(), Keypair::new());

    client.zap_in(session, &farm, &pool, 10_001).await.unwrap();

    let steps = recorder.lock().unwrap().clone();
    assert_eq!(steps.len(), 3);
    assert_eq!(
        steps[0],
        ZapStep::Swap(SwapParams {
            protocol:     zap_sdk::Protocol::Jupiter,
            from_mint:    USDC_MINT,
            to_mint:      pool.token_b_mint,
            amount:       5_000,
            slippage_bps: 100,
        })
    );
    assert_eq!(
        steps[1],
        ZapStep::AddLiquidity(AddLiquidityParams {
            protocol:        pool.protocol,
            pool_id:         pool.id,
            token_in_mint:   pool.token_b_mint,
            token_in_amount: 7_000,
        })
    );
    assert!(matches!(steps[2], ZapStep::Stake(StakeParams { version: 5, .. })));
}
