//! Wallet Service Module
//!
//! The node wallet is the only source of truth for chain data and funds.
//! Everything in the crate reaches it through the [`WalletService`] trait:
//! - [`RpcWalletClient`] talks JSON-RPC to a real node
//! - [`MockWallet`] is an in-memory fake for tests and demos (`mock-api`)

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock-api"))]
pub mod mock;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use client::RpcWalletClient;
pub use error::WalletError;
#[cfg(any(test, feature = "mock-api"))]
pub use mock::MockWallet;
pub use retry::RetryPolicy;
pub use types::{AddressValidation, ConfirmationRange, UnspentOutput};

/// Wallet RPC operations consumed by the game
#[async_trait]
pub trait WalletService: Send + Sync {
    /// `getblockcount`
    async fn block_count(&self) -> Result<u64, WalletError>;

    /// `getblockhash(height)`
    async fn block_hash(&self, height: u64) -> Result<String, WalletError>;

    /// `listunspent(minconf, maxconf, addresses)`. An empty slice means every
    /// address the wallet tracks.
    async fn list_unspent(
        &self,
        min_conf: u32,
        max_conf: u32,
        addresses: &[String],
    ) -> Result<Vec<UnspentOutput>, WalletError>;

    /// `importaddress(address, label, rescan)`
    async fn import_address(&self, address: &str, label: &str, rescan: bool)
    -> Result<(), WalletError>;

    /// `sendtoaddress(address, amount, comment, comment_to, subtractfeefromamount)`.
    /// Returns the transaction id.
    async fn send_to_address(
        &self,
        address: &str,
        amount: Decimal,
        comment: &str,
        comment_to: &str,
        subtract_fee_from_amount: bool,
    ) -> Result<String, WalletError>;

    /// `validateaddress(address)`
    async fn validate_address(&self, address: &str) -> Result<AddressValidation, WalletError>;

    /// `getreceivedbyaddress(address)`
    async fn received_by_address(&self, address: &str) -> Result<Decimal, WalletError>;
}
