//! Fund Transfer Gateway
//!
//! Buy-in and cash-out are the same on-chain payment in opposite directions.
//! Transfers from one source address run one at a time so two requests never
//! race for the same outputs at the wallet.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::error::FundsError;
use crate::ledger::is_dust;
use crate::wallet::{ConfirmationRange, WalletService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Player wallet to pool
    BuyIn,
    /// Pool to player wallet
    CashOut,
}

impl TransferDirection {
    /// `(from, to)` for this direction.
    pub fn route<'a>(self, player: &'a str, pool: &'a str) -> (&'a str, &'a str) {
        match self {
            TransferDirection::BuyIn => (player, pool),
            TransferDirection::CashOut => (pool, player),
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::BuyIn => write!(f, "buy-in"),
            TransferDirection::CashOut => write!(f, "cash-out"),
        }
    }
}

/// Proof of an accepted payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub txid: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
}

pub struct FundTransferGateway {
    wallet: Arc<dyn WalletService>,
    /// One lock per source address
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FundTransferGateway {
    pub fn new(wallet: Arc<dyn WalletService>) -> Self {
        Self {
            wallet,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, address: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Move funds between the player and the pool.
    pub async fn transfer(
        &self,
        direction: TransferDirection,
        player: &str,
        pool: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, FundsError> {
        let (from, to) = direction.route(player, pool);
        info!(%direction, from, to, %amount, "Transfer requested");
        self.send_funds(from, to, amount).await
    }

    /// Pay `amount` from `from` to `to`.
    ///
    /// Confirmed non-dust outputs of `from` must cover `amount`. That check
    /// is advisory: the wallet still picks which outputs it spends, and its own
    /// rejection comes back as [`FundsError::Wallet`]. Never retried.
    pub async fn send_funds(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, FundsError> {
        if amount <= Decimal::ZERO {
            return Err(FundsError::InvalidAmount);
        }

        let lock = self.lock_for(from);
        let result = {
            let _guard = lock.lock().await;
            debug!(from, "Transfer lock acquired");
            self.send_locked(from, to, amount).await
        };

        // Last user of this source drops its entry; waiters hold a clone
        drop(lock);
        self.locks.remove_if(from, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Source addresses with a transfer running or queued.
    pub fn active_sources(&self) -> usize {
        self.locks.len()
    }

    async fn send_locked(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, FundsError> {
        let range = ConfirmationRange::CONFIRMED;
        let utxos = self
            .wallet
            .list_unspent(range.min, range.max, &[from.to_string()])
            .await?;

        let eligible: Vec<_> = utxos.iter().filter(|u| !is_dust(u)).collect();
        if eligible.is_empty() {
            warn!(from, "No spendable outputs");
            return Err(FundsError::NoFunds {
                address: from.to_string(),
            });
        }

        let available: Decimal = eligible.iter().map(|u| u.amount).sum();
        if available < amount {
            warn!(from, %available, %amount, "Insufficient funds");
            return Err(FundsError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        let txid = self
            .wallet
            .send_to_address(to, amount, "", "", false)
            .await
            .map_err(|e| {
                error!(from, to, %amount, error = %e, "Payment rejected by wallet");
                FundsError::Wallet(e)
            })?;

        info!(from, to, %amount, txid = %txid, "Payment sent");
        Ok(TransferReceipt {
            txid,
            from_address: from.to_string(),
            to_address: to.to_string(),
            amount,
        })
    }
}
