use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::types::{AddressInfo, BalancesReport, WalletView, filter_utxos};
use crate::wallet::{ConfirmationRange, WalletService};

/// Turns the wallet's unspent outputs into balances.
///
/// Queries never fail past this boundary: a wallet error is logged and the
/// affected view degrades to zero balance and no outputs.
pub struct LedgerReconciler {
    wallet: Arc<dyn WalletService>,
    confirmations: ConfirmationRange,
}

impl LedgerReconciler {
    pub fn new(wallet: Arc<dyn WalletService>) -> Self {
        Self {
            wallet,
            confirmations: ConfirmationRange::ANY,
        }
    }

    /// Balance and sorted outputs for one address, `None` if the wallet failed.
    pub async fn address_info(&self, address: &str) -> Option<AddressInfo> {
        let addresses = [address.to_string()];
        match self
            .wallet
            .list_unspent(self.confirmations.min, self.confirmations.max, &addresses)
            .await
        {
            Ok(utxos) => {
                let info = AddressInfo::from_utxos(utxos);
                debug!(address, balance = %info.balance, utxos = info.utxos.len(), "Address resolved");
                Some(info)
            }
            Err(e) => {
                warn!(address, error = %e, "Failed to fetch unspent outputs");
                None
            }
        }
    }

    /// Resolve both wallets independently; one failing leaves the other intact.
    pub async fn balances_and_utxos(&self, player: &str, pool: &str) -> BalancesReport {
        let (player_info, pool_info) =
            tokio::join!(self.address_info(player), self.address_info(pool));

        BalancesReport {
            player_wallet: WalletView::new(player, player_info),
            player_pool_wallet: WalletView::new(pool, pool_info),
        }
    }

    /// Track the pool as watch-only, then report both wallets without dust.
    pub async fn filtered_balances_and_utxos(&self, player: &str, pool: &str) -> BalancesReport {
        self.track_watch_only(pool).await;

        let report = self.balances_and_utxos(player, pool).await;
        BalancesReport {
            player_wallet: filter_utxos(report.player_wallet),
            player_pool_wallet: filter_utxos(report.player_pool_wallet),
        }
    }

    /// `importaddress` without rescan. Import failures never propagate.
    pub async fn track_watch_only(&self, address: &str) {
        match self.wallet.import_address(address, "", false).await {
            Ok(()) => debug!(address, "Watch-only address imported"),
            Err(e) if e.is_duplicate_import() => debug!(address, "Address already tracked"),
            Err(e) => warn!(address, error = %e, "Failed to import watch-only address"),
        }
    }

    /// Spendable addresses of this wallet whose balance exceeds `min_balance`.
    ///
    /// Watch-only addresses (such as an imported pool) are skipped. Sorted by address.
    pub async fn player_addresses(&self, min_balance: Decimal) -> Vec<(String, Decimal)> {
        let utxos = match self
            .wallet
            .list_unspent(self.confirmations.min, self.confirmations.max, &[])
            .await
        {
            Ok(utxos) => utxos,
            Err(e) => {
                warn!(error = %e, "Failed to list wallet outputs");
                return Vec::new();
            }
        };

        let mut watch_only: HashMap<String, bool> = HashMap::new();
        let mut balances: BTreeMap<String, Decimal> = BTreeMap::new();

        for utxo in utxos {
            let Some(address) = utxo.address else {
                continue;
            };

            let skip = match watch_only.get(&address) {
                Some(&known) => known,
                None => {
                    let is_watch_only = match self.wallet.validate_address(&address).await {
                        Ok(info) => info.iswatchonly,
                        Err(e) => {
                            warn!(address = %address, error = %e, "validateaddress failed, skipping");
                            true
                        }
                    };
                    watch_only.insert(address.clone(), is_watch_only);
                    is_watch_only
                }
            };
            if skip {
                continue;
            }

            *balances.entry(address).or_insert(Decimal::ZERO) += utxo.amount;
        }

        let addresses: Vec<(String, Decimal)> = balances
            .into_iter()
            .filter(|(_, balance)| *balance > min_balance)
            .collect();
        info!(count = addresses.len(), "Player addresses discovered");
        addresses
    }

    /// Total ever received by `address`, `None` if the wallet failed.
    pub async fn received_by_address(&self, address: &str) -> Option<Decimal> {
        match self.wallet.received_by_address(address).await {
            Ok(amount) => Some(amount),
            Err(e) => {
                warn!(address, error = %e, "Failed to fetch received amount");
                None
            }
        }
    }
}
