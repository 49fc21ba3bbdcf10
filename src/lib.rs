//! Lucky Suits - block-hash dealt card game over a UTXO wallet node
//!
//! Cards are drawn from the hashes of past blocks; buy-in and cash-out are
//! plain wallet payments between a player address and a pool address.
//!
//! # Modules
//!
//! - [`wallet`] - Wallet node JSON-RPC client and the `WalletService` seam
//! - [`entropy`] - Chain height and block-hash source with caching
//! - [`cards`] - Suits, ranks and the digit-band classification
//! - [`dealer`] - Turns block hashes into dealt cards
//! - [`ledger`] - Balances and unspent outputs, dust filtering
//! - [`funding`] - Buy-in / cash-out payments
//! - [`game`] - Bets, payouts and the per-player session
//! - [`config`] - YAML configuration
//! - [`logging`] - Tracing subscriber setup

pub mod cards;
pub mod config;
pub mod dealer;
pub mod entropy;
pub mod funding;
pub mod game;
pub mod ledger;
pub mod logging;
pub mod wallet;

// Convenient re-exports at crate root
pub use cards::{CardOutcome, Color, DeckCard, JackpotCard, Rank, Suit, classify};
pub use config::{AppConfig, ConfigError};
pub use dealer::{CardDealer, Deal, DealError, RoundSeed};
pub use entropy::{BlockEntropySource, EntropyError};
pub use funding::{FundTransferGateway, FundsError, TransferDirection, TransferReceipt};
pub use game::{Bet, GameSession, RoundResult, SessionError};
pub use ledger::{BalancesReport, LedgerReconciler, WalletView};
pub use wallet::{RpcWalletClient, UnspentOutput, WalletError, WalletService};
