//! Game Session
//!
//! Per-player table state. Credits live only in memory; every credit change
//! is either a settled round or a transfer the wallet accepted.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::bet::Bet;
use crate::dealer::{CardDealer, Deal, DealError, RoundSeed};
use crate::funding::{FundTransferGateway, FundsError, TransferDirection, TransferReceipt};
use crate::ledger::{BalancesReport, LedgerReconciler};

/// Jackpot outcomes carry no payout at this table and are dealt again.
pub const MAX_JACKPOT_REDRAWS: u32 = 16;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Wager must be positive")]
    InvalidWager,

    #[error("Wager {wager} exceeds credits {credits}")]
    InsufficientCredits { wager: Decimal, credits: Decimal },

    #[error("Wager {wager} exceeds the table limit {max}")]
    WagerAboveLimit { wager: Decimal, max: Decimal },

    #[error("No credits to cash out")]
    NoCredits,

    #[error("Deal failed: {0}")]
    Deal(#[from] DealError),

    #[error("Only jackpots after {0} redraws")]
    JackpotLoop(u32),

    #[error("Transfer failed: {0}")]
    Funds(#[from] FundsError),
}

/// Largest wager the pool can cover: a tenth of what the pool holds beyond
/// the player's credits, capped at the credits, never below 1.
pub fn max_wager(credits: Decimal, pool_balance: Decimal) -> Decimal {
    let pool_minus_credits = (pool_balance - credits).max(Decimal::ZERO);
    let limit = credits.min((pool_minus_credits * Decimal::new(1, 1)).floor());
    limit.max(Decimal::ONE)
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundResult {
    pub bet: Bet,
    pub wager: Decimal,
    pub deal: Deal,
    pub winnings: Decimal,
    pub credits: Decimal,
    pub redrawn_jackpots: u32,
}

pub struct GameSession {
    player_address: String,
    pool_address: String,
    credits: Decimal,
    player_balance: Decimal,
    pool_balance: Decimal,
    dealer: Arc<CardDealer>,
    reconciler: Arc<LedgerReconciler>,
    gateway: Arc<FundTransferGateway>,
}

impl GameSession {
    pub fn new(
        player_address: &str,
        pool_address: &str,
        dealer: Arc<CardDealer>,
        reconciler: Arc<LedgerReconciler>,
        gateway: Arc<FundTransferGateway>,
    ) -> Self {
        Self {
            player_address: player_address.to_string(),
            pool_address: pool_address.to_string(),
            credits: Decimal::ZERO,
            player_balance: Decimal::ZERO,
            pool_balance: Decimal::ZERO,
            dealer,
            reconciler,
            gateway,
        }
    }

    pub fn credits(&self) -> Decimal {
        self.credits
    }

    pub fn player_balance(&self) -> Decimal {
        self.player_balance
    }

    pub fn pool_balance(&self) -> Decimal {
        self.pool_balance
    }

    pub fn max_wager(&self) -> Decimal {
        max_wager(self.credits, self.pool_balance)
    }

    /// Re-read both wallets (dust excluded) and cache their balances.
    pub async fn refresh_balances(&mut self) -> BalancesReport {
        let report = self
            .reconciler
            .filtered_balances_and_utxos(&self.player_address, &self.pool_address)
            .await;
        self.player_balance = report.player_wallet.balance;
        self.pool_balance = report.player_pool_wallet.balance;
        report
    }

    /// Deal one round. Credits only change once a card has been dealt.
    pub async fn play_round(&mut self, bet: Bet, wager: Decimal) -> Result<RoundResult, SessionError> {
        if wager <= Decimal::ZERO {
            return Err(SessionError::InvalidWager);
        }
        if wager > self.credits {
            return Err(SessionError::InsufficientCredits {
                wager,
                credits: self.credits,
            });
        }
        let max = self.max_wager();
        if wager > max {
            return Err(SessionError::WagerAboveLimit { wager, max });
        }

        let (deal, redrawn_jackpots) = self.deal_non_jackpot().await?;
        let winnings = bet.winnings(deal.outcome.suit(), wager);
        self.credits = self.credits - wager + winnings;

        info!(
            %bet,
            %wager,
            card = %deal.outcome,
            %winnings,
            credits = %self.credits,
            "Round settled"
        );

        self.refresh_balances().await;

        Ok(RoundResult {
            bet,
            wager,
            deal,
            winnings,
            credits: self.credits,
            redrawn_jackpots,
        })
    }

    /// Each draw gets its own seed so every dealt card can be replayed.
    async fn deal_non_jackpot(&self) -> Result<(Deal, u32), SessionError> {
        for redraws in 0..=MAX_JACKPOT_REDRAWS {
            let deal = self.dealer.deal_with_seed(RoundSeed::random()).await?;
            if !deal.outcome.is_jackpot() {
                return Ok((deal, redraws));
            }
            info!(card = %deal.outcome, "Jackpot drawn, dealing again");
        }
        Err(SessionError::JackpotLoop(MAX_JACKPOT_REDRAWS))
    }

    /// Pay `amount` into the pool and credit it. Credits are untouched on failure.
    pub async fn buy_in(&mut self, amount: Decimal) -> Result<TransferReceipt, SessionError> {
        let receipt = self
            .gateway
            .transfer(
                TransferDirection::BuyIn,
                &self.player_address,
                &self.pool_address,
                amount,
            )
            .await
            .inspect_err(|e| warn!(error = %e, "Buy-in failed, credits unchanged"))?;

        self.credits += amount;
        info!(%amount, credits = %self.credits, txid = %receipt.txid, "Buy-in credited");
        self.refresh_balances().await;
        Ok(receipt)
    }

    /// Pay all credits out of the pool to the player.
    pub async fn cash_out(&mut self) -> Result<TransferReceipt, SessionError> {
        if self.credits <= Decimal::ZERO {
            return Err(SessionError::NoCredits);
        }

        let amount = self.credits;
        let receipt = self
            .gateway
            .transfer(
                TransferDirection::CashOut,
                &self.player_address,
                &self.pool_address,
                amount,
            )
            .await
            .inspect_err(|e| warn!(error = %e, "Cash-out failed, credits unchanged"))?;

        self.credits = Decimal::ZERO;
        info!(%amount, txid = %receipt.txid, "Cashed out");
        self.refresh_balances().await;
        Ok(receipt)
    }
}
