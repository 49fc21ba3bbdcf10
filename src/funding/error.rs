use rust_decimal::Decimal;
use thiserror::Error;

use crate::wallet::WalletError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FundsError {
    #[error("Invalid amount: must be positive")]
    InvalidAmount,

    #[error("No spendable outputs on {address}")]
    NoFunds { address: String },

    #[error("Insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}
