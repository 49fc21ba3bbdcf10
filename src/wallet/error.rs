use thiserror::Error;

/// Errors surfaced by a [`WalletService`](super::WalletService) call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Connection refused, timeout or a broken HTTP exchange. Safe to retry.
    #[error("Wallet service unavailable: {0}")]
    Unavailable(String),

    #[error("Wallet service rejected the RPC credentials")]
    Unauthorized,

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid wallet response: {0}")]
    InvalidResponse(String),
}

/// `RPC_WALLET_ERROR`, the node's generic wallet failure code
pub const RPC_WALLET_ERROR: i64 = -4;

/// Message the node pairs with [`RPC_WALLET_ERROR`] when `importaddress`
/// targets an address it already holds.
const DUPLICATE_IMPORT_MESSAGE: &str = "already contains";

impl WalletError {
    /// Transient failures are worth retrying with backoff; everything else is
    /// a definitive answer from the node.
    pub fn is_transient(&self) -> bool {
        matches!(self, WalletError::Unavailable(_))
    }

    /// True when an `importaddress` failed only because the address is already tracked.
    pub fn is_duplicate_import(&self) -> bool {
        match self {
            WalletError::Rpc { code, message } => {
                *code == RPC_WALLET_ERROR && message.contains(DUPLICATE_IMPORT_MESSAGE)
            }
            _ => false,
        }
    }
}
