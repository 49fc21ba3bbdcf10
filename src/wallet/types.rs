use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One unspent transaction output as reported by `listunspent`.
///
/// A snapshot taken at query time; the node is the only authority on whether
/// it is still unspent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    #[serde(rename = "txid")]
    pub transaction_id: String,
    #[serde(rename = "vout")]
    pub output_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub amount: Decimal,
    pub confirmations: u64,
}

impl UnspentOutput {
    pub fn new(transaction_id: &str, output_index: u32, amount: Decimal, confirmations: u64) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            output_index,
            address: None,
            amount,
            confirmations,
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }
}

/// Subset of the `validateaddress` result the game cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressValidation {
    pub isvalid: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub ismine: bool,
    #[serde(default)]
    pub iswatchonly: bool,
}

/// Confirmation window passed to `listunspent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationRange {
    pub min: u32,
    pub max: u32,
}

impl ConfirmationRange {
    /// Upper bound used by the node's own RPC help examples.
    pub const MAX_CONFIRMATIONS: u32 = 9_999_999;

    /// Everything, including outputs still in the mempool.
    pub const ANY: ConfirmationRange = ConfirmationRange {
        min: 0,
        max: Self::MAX_CONFIRMATIONS,
    };

    /// Outputs mined in at least one block.
    pub const CONFIRMED: ConfirmationRange = ConfirmationRange {
        min: 1,
        max: Self::MAX_CONFIRMATIONS,
    };
}
