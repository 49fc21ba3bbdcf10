//! End-to-end flows against the in-memory wallet (feature `mock-api`)

use std::sync::Arc;

use rust_decimal::Decimal;

use lucky_suits::cards::{CardOutcome, Suit, classify};
use lucky_suits::dealer::{CardDealer, RoundSeed};
use lucky_suits::entropy::BlockEntropySource;
use lucky_suits::funding::FundTransferGateway;
use lucky_suits::game::{Bet, GameSession};
use lucky_suits::ledger::{DUST_AMOUNT, LedgerReconciler};
use lucky_suits::wallet::{MockWallet, UnspentOutput};

const PLAYER: &str = "DPlayer1";
const POOL: &str = "DPool";

/// Realistic 64-hex block hashes
const CHAIN: [&str; 6] = [
    "1a91e3dace36e2be3bf030a65679fe821aa1d6ef92e7c9902eb318182c355691",
    "82bc68038f6034c0596b6e313729793a887fded6e92a31fbdf70863f89d9bea2",
    "ea5380659e02a68c073369e502125c634b2fb0aaf351b9360c673368c4f20c96",
    "76f4e6bdf5c4bca3a8b2f0d3a7a3bd00d00b7ca8b6a97b2f1e1c4bd1b5bd9b7a",
    "00000000000000000009b3a0bcc7c4ca7bfdcfc4c1db1c7e01b5bd1d1c0d7f6c",
    "fdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbfdbf",
];

fn dealer(wallet: Arc<MockWallet>) -> Arc<CardDealer> {
    let entropy = Arc::new(BlockEntropySource::new(wallet, None, 64));
    Arc::new(CardDealer::new(entropy, 64))
}

#[tokio::test]
async fn dealt_cards_match_their_block_hash_window() {
    let wallet = Arc::new(MockWallet::with_blocks(CHAIN));
    let dealer = dealer(wallet.clone());

    for _ in 0..50 {
        let deal = dealer.deal_with_seed(RoundSeed::random()).await.unwrap();

        assert_eq!(deal.tip, 5);
        assert_eq!(deal.block_hash, CHAIN[deal.height as usize]);
        let window = &deal.block_hash[deal.window_offset..deal.window_offset + 3];
        assert_eq!(u16::from_str_radix(window, 16).unwrap(), deal.digits);
        assert_eq!(classify(deal.digits), Some(deal.outcome));
        assert!(deal.attempts >= 1);
    }

    // Tip is read once per process; the hash cache never exceeds the chain
    assert_eq!(wallet.calls("getblockcount"), 1);
    assert!(dealer.entropy().cached_hash_count().await <= CHAIN.len());
}

#[tokio::test]
async fn seeded_deal_replays_exactly() {
    let wallet = Arc::new(MockWallet::with_blocks(CHAIN));
    let seed = RoundSeed::random();

    let first = dealer(wallet.clone()).deal_with_seed(seed).await.unwrap();
    let replay = dealer(wallet).deal_with_seed(seed).await.unwrap();

    assert_eq!(first, replay);
    assert_eq!(replay.seed, Some(seed));
}

#[tokio::test]
async fn transient_wallet_outage_fails_the_deal_then_recovers() {
    let wallet = Arc::new(MockWallet::with_blocks(CHAIN));
    let dealer = dealer(wallet.clone());

    wallet.fail_next(1);
    let err = dealer.deal_card().await.unwrap_err();
    assert!(err.is_transient());

    assert!(dealer.deal_card().await.is_ok());
}

#[tokio::test]
async fn buy_in_play_and_cash_out() {
    // Every hash deals the 2 of Hearts
    let wallet = Arc::new(MockWallet::with_blocks(["000", "000", "000"]));
    wallet.add_utxo(PLAYER, UnspentOutput::new("aa", 0, Decimal::from(25), 12));
    wallet.add_utxo(PLAYER, UnspentOutput::new("ab", 1, DUST_AMOUNT, 12));
    wallet.add_utxo(POOL, UnspentOutput::new("ba", 0, Decimal::from(500), 40));

    let reconciler = Arc::new(LedgerReconciler::new(wallet.clone()));
    let mut session = GameSession::new(
        PLAYER,
        POOL,
        dealer(wallet.clone()),
        reconciler.clone(),
        Arc::new(FundTransferGateway::new(wallet.clone())),
    );

    let report = session.refresh_balances().await;
    assert_eq!(report.player_wallet.balance, Decimal::from(25));
    assert_eq!(report.player_wallet.utxos.len(), 1);
    assert!(report.player_pool_wallet.available);

    session.buy_in(Decimal::from(10)).await.unwrap();
    assert_eq!(session.max_wager(), Decimal::from(10));

    let won = session
        .play_round(Bet::Suit(Suit::Hearts), Decimal::from(5))
        .await
        .unwrap();
    assert!(matches!(won.deal.outcome, CardOutcome::Deck(_)));
    assert_eq!(won.credits, Decimal::from(25));

    let lost = session
        .play_round("black".parse().unwrap(), Decimal::from(10))
        .await
        .unwrap();
    assert_eq!(lost.winnings, Decimal::ZERO);
    assert_eq!(session.credits(), Decimal::from(15));

    let receipt = session.cash_out().await.unwrap();
    assert_eq!(receipt.amount, Decimal::from(15));
    assert_eq!(session.credits(), Decimal::ZERO);

    let payments = wallet.payments();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].to_address, POOL);
    assert_eq!(payments[0].amount, Decimal::from(10));
    assert_eq!(payments[1].to_address, PLAYER);
    assert_eq!(payments[1].amount, Decimal::from(15));
}

#[tokio::test]
async fn discovery_skips_the_imported_pool() {
    let wallet = Arc::new(MockWallet::new());
    wallet.add_utxo(PLAYER, UnspentOutput::new("a1", 0, Decimal::from(3), 2));
    wallet.add_utxo("DPoor", UnspentOutput::new("c1", 0, Decimal::ONE, 2));
    wallet.add_utxo(POOL, UnspentOutput::new("b1", 0, Decimal::from(900), 2));

    let reconciler = LedgerReconciler::new(wallet.clone());
    reconciler.track_watch_only(POOL).await;

    let found = reconciler.player_addresses(Decimal::ONE).await;

    assert_eq!(found, vec![(PLAYER.to_string(), Decimal::from(3))]);
}

#[tokio::test]
async fn one_unreachable_wallet_leaves_the_other_intact() {
    let wallet = Arc::new(MockWallet::new());
    wallet.add_utxo(PLAYER, UnspentOutput::new("a1", 0, Decimal::from(7), 2));
    wallet.fail_address(POOL);

    let report = LedgerReconciler::new(wallet)
        .filtered_balances_and_utxos(PLAYER, POOL)
        .await;

    assert_eq!(report.player_wallet.balance, Decimal::from(7));
    assert!(report.player_wallet.available);
    assert!(!report.player_pool_wallet.available);
    assert_eq!(report.player_pool_wallet.balance, Decimal::ZERO);
    assert!(report.player_pool_wallet.utxos.is_empty());
}
