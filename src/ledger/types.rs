use rust_decimal::Decimal;
use serde::Serialize;

use crate::wallet::UnspentOutput;

/// Operational dust amount. Outputs of exactly this value are not game funds.
pub const DUST_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

pub fn is_dust(utxo: &UnspentOutput) -> bool {
    utxo.amount == DUST_AMOUNT
}

/// Balance and outputs of an address as reported by `listunspent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub balance: Decimal,
    /// Sorted by confirmations, then amount, both descending
    pub utxos: Vec<UnspentOutput>,
}

impl AddressInfo {
    pub fn from_utxos(mut utxos: Vec<UnspentOutput>) -> Self {
        utxos.sort_by(|a, b| {
            b.confirmations
                .cmp(&a.confirmations)
                .then_with(|| b.amount.cmp(&a.amount))
        });
        Self {
            balance: utxos.iter().map(|u| u.amount).sum(),
            utxos,
        }
    }
}

/// One wallet's side of a balance report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletView {
    pub address: String,
    pub balance: Decimal,
    pub utxos: Vec<UnspentOutput>,
    /// False when the wallet service failed and the zero/empty defaults are shown.
    pub available: bool,
}

impl WalletView {
    pub fn new(address: &str, info: Option<AddressInfo>) -> Self {
        match info {
            Some(info) => Self {
                address: address.to_string(),
                balance: info.balance,
                utxos: info.utxos,
                available: true,
            },
            None => Self::unavailable(address),
        }
    }

    pub fn unavailable(address: &str) -> Self {
        Self {
            address: address.to_string(),
            balance: Decimal::ZERO,
            utxos: Vec::new(),
            available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancesReport {
    pub player_wallet: WalletView,
    pub player_pool_wallet: WalletView,
}

/// Drop dust outputs and recompute the balance from what remains.
pub fn filter_utxos(mut view: WalletView) -> WalletView {
    view.utxos.retain(|u| !is_dust(u));
    view.balance = view.utxos.iter().map(|u| u.amount).sum();
    view
}
