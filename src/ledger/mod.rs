//! Ledger Reconciliation Module
//!
//! Balances are never stored locally. They are derived on demand from the
//! wallet's unspent outputs, with operational dust (exactly 0.001) excluded.

pub mod reconciler;
pub mod types;

pub use reconciler::LedgerReconciler;
pub use types::{AddressInfo, BalancesReport, DUST_AMOUNT, WalletView, filter_utxos, is_dust};
