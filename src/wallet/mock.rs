//! In-memory wallet service for tests and offline demos.
//!
//! Blocks are a `Vec` of hashes indexed by height, so the chain tip is
//! `len - 1`. Every call is counted per RPC method name, and failures can be
//! injected globally, per address, or for the next N calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::WalletService;
use super::error::WalletError;
use super::types::{AddressValidation, UnspentOutput};

/// A payment accepted by [`MockWallet::send_to_address`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPayment {
    pub txid: String,
    pub to_address: String,
    pub amount: Decimal,
}

#[derive(Default)]
struct MockState {
    block_hashes: Vec<String>,
    utxos: HashMap<String, Vec<UnspentOutput>>,
    watch_only: HashSet<String>,
    imported: Vec<String>,
    received: HashMap<String, Decimal>,
    payments: Vec<MockPayment>,
    failing_addresses: HashSet<String>,
    transient_failures: u32,
    unavailable: bool,
    import_error: Option<WalletError>,
    send_error: Option<WalletError>,
    send_delay: Duration,
    calls: HashMap<&'static str, usize>,
}

#[derive(Default)]
pub struct MockWallet {
    state: Mutex<MockState>,
    in_flight_sends: AtomicUsize,
    max_in_flight_sends: AtomicUsize,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock chain whose block at height `h` has hash `hashes[h]`.
    pub fn with_blocks<S: Into<String>>(hashes: impl IntoIterator<Item = S>) -> Self {
        let wallet = Self::new();
        wallet.set_blocks(hashes);
        wallet
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_blocks<S: Into<String>>(&self, hashes: impl IntoIterator<Item = S>) {
        self.state().block_hashes = hashes.into_iter().map(Into::into).collect();
    }

    pub fn push_block(&self, hash: &str) {
        self.state().block_hashes.push(hash.to_string());
    }

    pub fn add_utxo(&self, address: &str, utxo: UnspentOutput) {
        let utxo = utxo.with_address(address);
        self.state()
            .utxos
            .entry(address.to_string())
            .or_default()
            .push(utxo);
    }

    pub fn mark_watch_only(&self, address: &str) {
        self.state().watch_only.insert(address.to_string());
    }

    pub fn set_received(&self, address: &str, amount: Decimal) {
        self.state().received.insert(address.to_string(), amount);
    }

    /// Every call fails with [`WalletError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// The next `n` calls fail with [`WalletError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.state().transient_failures = n;
    }

    /// `listunspent` and `getreceivedbyaddress` fail for this address.
    pub fn fail_address(&self, address: &str) {
        self.state().failing_addresses.insert(address.to_string());
    }

    pub fn set_import_error(&self, error: Option<WalletError>) {
        self.state().import_error = error;
    }

    pub fn set_send_error(&self, error: Option<WalletError>) {
        self.state().send_error = error;
    }

    /// Hold each `sendtoaddress` open for `delay` to expose overlapping sends.
    pub fn set_send_delay(&self, delay: Duration) {
        self.state().send_delay = delay;
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state().calls.get(method).copied().unwrap_or(0)
    }

    pub fn payments(&self) -> Vec<MockPayment> {
        self.state().payments.clone()
    }

    pub fn imported(&self) -> Vec<String> {
        self.state().imported.clone()
    }

    /// Highest number of `sendtoaddress` calls observed running at once.
    pub fn max_in_flight_sends(&self) -> usize {
        self.max_in_flight_sends.load(Ordering::SeqCst)
    }

    /// Count the call and apply global failure injection.
    fn enter(&self, method: &'static str) -> Result<(), WalletError> {
        let mut state = self.state();
        *state.calls.entry(method).or_default() += 1;

        if state.unavailable {
            return Err(WalletError::Unavailable("mock wallet is offline".to_string()));
        }
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(WalletError::Unavailable("mock transient failure".to_string()));
        }
        Ok(())
    }

    fn check_address(state: &MockState, address: &str) -> Result<(), WalletError> {
        if state.failing_addresses.contains(address) {
            return Err(WalletError::Rpc {
                code: -5,
                message: format!("Invalid address: {}", address),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WalletService for MockWallet {
    async fn block_count(&self) -> Result<u64, WalletError> {
        self.enter("getblockcount")?;
        Ok(self.state().block_hashes.len().saturating_sub(1) as u64)
    }

    async fn block_hash(&self, height: u64) -> Result<String, WalletError> {
        self.enter("getblockhash")?;
        self.state()
            .block_hashes
            .get(height as usize)
            .cloned()
            .ok_or_else(|| WalletError::Rpc {
                code: -8,
                message: "Block height out of range".to_string(),
            })
    }

    async fn list_unspent(
        &self,
        min_conf: u32,
        max_conf: u32,
        addresses: &[String],
    ) -> Result<Vec<UnspentOutput>, WalletError> {
        self.enter("listunspent")?;
        let state = self.state();
        for address in addresses {
            Self::check_address(&state, address)?;
        }

        let in_range = |u: &&UnspentOutput| {
            u.confirmations >= u64::from(min_conf) && u.confirmations <= u64::from(max_conf)
        };

        let mut result: Vec<UnspentOutput> = if addresses.is_empty() {
            state.utxos.values().flatten().filter(in_range).cloned().collect()
        } else {
            addresses
                .iter()
                .filter_map(|a| state.utxos.get(a))
                .flatten()
                .filter(in_range)
                .cloned()
                .collect()
        };
        result.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        Ok(result)
    }

    async fn import_address(
        &self,
        address: &str,
        _label: &str,
        _rescan: bool,
    ) -> Result<(), WalletError> {
        self.enter("importaddress")?;
        let mut state = self.state();
        if let Some(error) = state.import_error.clone() {
            return Err(error);
        }
        state.imported.push(address.to_string());
        state.watch_only.insert(address.to_string());
        Ok(())
    }

    async fn send_to_address(
        &self,
        address: &str,
        amount: Decimal,
        _comment: &str,
        _comment_to: &str,
        _subtract_fee_from_amount: bool,
    ) -> Result<String, WalletError> {
        self.enter("sendtoaddress")?;
        let delay = self.state().send_delay;

        let now = self.in_flight_sends.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_sends.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight_sends.fetch_sub(1, Ordering::SeqCst);

        let mut state = self.state();
        if let Some(error) = state.send_error.clone() {
            return Err(error);
        }
        let txid = format!("{:x}", uuid::Uuid::new_v4().simple());
        state.payments.push(MockPayment {
            txid: txid.clone(),
            to_address: address.to_string(),
            amount,
        });
        Ok(txid)
    }

    async fn validate_address(&self, address: &str) -> Result<AddressValidation, WalletError> {
        self.enter("validateaddress")?;
        let state = self.state();
        let iswatchonly = state.watch_only.contains(address);
        Ok(AddressValidation {
            isvalid: true,
            address: Some(address.to_string()),
            ismine: !iswatchonly,
            iswatchonly,
        })
    }

    async fn received_by_address(&self, address: &str) -> Result<Decimal, WalletError> {
        self.enter("getreceivedbyaddress")?;
        let state = self.state();
        Self::check_address(&state, address)?;
        Ok(state.received.get(address).copied().unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chain_tip_and_hashes() {
        let wallet = MockWallet::with_blocks(["aa", "bb", "cc"]);
        assert_eq!(wallet.block_count().await.unwrap(), 2);
        assert_eq!(wallet.block_hash(1).await.unwrap(), "bb");
        assert!(matches!(
            wallet.block_hash(3).await,
            Err(WalletError::Rpc { code: -8, .. })
        ));
        assert_eq!(wallet.calls("getblockhash"), 2);
    }

    #[tokio::test]
    async fn test_mock_listunspent_filters() {
        let wallet = MockWallet::new();
        wallet.add_utxo("A", UnspentOutput::new("t1", 0, Decimal::from(2), 0));
        wallet.add_utxo("A", UnspentOutput::new("t2", 1, Decimal::from(3), 6));
        wallet.add_utxo("B", UnspentOutput::new("t3", 0, Decimal::from(4), 1));

        let confirmed = wallet
            .list_unspent(1, 9_999_999, &["A".to_string()])
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].transaction_id, "t2");

        let all = wallet.list_unspent(0, 9_999_999, &[]).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|u| u.address.is_some()));
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let wallet = MockWallet::with_blocks(["aa"]);
        wallet.fail_next(1);
        assert!(wallet.block_count().await.unwrap_err().is_transient());
        assert_eq!(wallet.block_count().await.unwrap(), 0);

        wallet.set_unavailable(true);
        assert!(wallet.block_hash(0).await.is_err());
    }
}
