//! Block entropy source
//!
//! Chain height and block hashes from the wallet service, cached:
//! - the height is kept until `height_ttl` expires (forever when `None`) or
//!   [`BlockEntropySource::refresh_height`] is called
//! - block hashes never change once mined and live in a bounded LRU

use std::sync::Arc;
use std::time::Duration;

use cached::{Cached, SizedCache};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::EntropyConfig;
use crate::wallet::{WalletError, WalletService};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntropyError {
    #[error("Wallet service unavailable: {0}")]
    ServiceUnavailable(#[from] WalletError),

    #[error("Invalid height {height}: chain tip is {tip}")]
    InvalidHeight { height: u64, tip: u64 },
}

#[derive(Debug, Clone, Copy)]
struct CachedHeight {
    value: u64,
    fetched_at: Instant,
}

pub struct BlockEntropySource {
    wallet: Arc<dyn WalletService>,
    height_ttl: Option<Duration>,
    height: Mutex<Option<CachedHeight>>,
    hashes: Mutex<SizedCache<u64, String>>,
}

impl BlockEntropySource {
    pub fn new(
        wallet: Arc<dyn WalletService>,
        height_ttl: Option<Duration>,
        hash_cache_capacity: usize,
    ) -> Self {
        Self {
            wallet,
            height_ttl,
            height: Mutex::new(None),
            hashes: Mutex::new(SizedCache::with_size(hash_cache_capacity.max(1))),
        }
    }

    pub fn from_config(wallet: Arc<dyn WalletService>, config: &EntropyConfig) -> Self {
        Self::new(wallet, config.height_ttl(), config.hash_cache_capacity)
    }

    /// Current chain height, served from cache while fresh.
    pub async fn height(&self) -> Result<u64, EntropyError> {
        let mut cached = self.height.lock().await;
        if let Some(entry) = *cached {
            let fresh = match self.height_ttl {
                None => true,
                Some(ttl) => entry.fetched_at.elapsed() < ttl,
            };
            if fresh {
                return Ok(entry.value);
            }
        }

        let value = self.wallet.block_count().await?;
        *cached = Some(CachedHeight {
            value,
            fetched_at: Instant::now(),
        });
        debug!(height = value, "Chain height fetched");
        Ok(value)
    }

    /// Drop the cached height and fetch it again.
    pub async fn refresh_height(&self) -> Result<u64, EntropyError> {
        self.height.lock().await.take();
        let height = self.height().await?;
        info!(height, "Chain height refreshed");
        Ok(height)
    }

    /// Hash of the block at `height`. Heights above the cached tip are rejected
    /// without a network call.
    pub async fn block_hash(&self, height: u64) -> Result<String, EntropyError> {
        let tip = self.height().await?;
        if height > tip {
            return Err(EntropyError::InvalidHeight { height, tip });
        }

        if let Some(hash) = self.hashes.lock().await.cache_get(&height) {
            return Ok(hash.clone());
        }

        // Cache lock is not held across the round trip
        let hash = self.wallet.block_hash(height).await?;
        self.hashes.lock().await.cache_set(height, hash.clone());
        Ok(hash)
    }

    pub async fn cached_hash_count(&self) -> usize {
        self.hashes.lock().await.cache_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MockWallet;

    fn source(wallet: &Arc<MockWallet>, ttl: Option<Duration>, capacity: usize) -> BlockEntropySource {
        BlockEntropySource::new(wallet.clone(), ttl, capacity)
    }

    #[tokio::test]
    async fn test_height_is_cached_for_process_lifetime() {
        let wallet = Arc::new(MockWallet::with_blocks(["a0", "a1", "a2"]));
        let entropy = source(&wallet, None, 16);

        assert_eq!(entropy.height().await.unwrap(), 2);
        wallet.push_block("a3");
        assert_eq!(entropy.height().await.unwrap(), 2);
        assert_eq!(wallet.calls("getblockcount"), 1);

        assert_eq!(entropy.refresh_height().await.unwrap(), 3);
        assert_eq!(wallet.calls("getblockcount"), 2);
    }

    #[tokio::test]
    async fn test_expired_height_is_refetched() {
        let wallet = Arc::new(MockWallet::with_blocks(["a0", "a1"]));
        let entropy = source(&wallet, Some(Duration::ZERO), 16);

        assert_eq!(entropy.height().await.unwrap(), 1);
        wallet.push_block("a2");
        assert_eq!(entropy.height().await.unwrap(), 2);
        assert_eq!(wallet.calls("getblockcount"), 2);
    }

    #[tokio::test]
    async fn test_height_failure_is_service_unavailable() {
        let wallet = Arc::new(MockWallet::with_blocks(["a0"]));
        wallet.set_unavailable(true);
        let entropy = source(&wallet, None, 16);

        let err = entropy.height().await.unwrap_err();
        assert!(matches!(err, EntropyError::ServiceUnavailable(WalletError::Unavailable(_))));

        // Failures are not cached
        wallet.set_unavailable(false);
        assert_eq!(entropy.height().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_block_hash_is_idempotent_and_cached() {
        let wallet = Arc::new(MockWallet::with_blocks(["a0", "a1", "a2"]));
        let entropy = source(&wallet, None, 16);

        let first = entropy.block_hash(1).await.unwrap();
        let second = entropy.block_hash(1).await.unwrap();

        assert_eq!(first, "a1");
        assert_eq!(first, second);
        assert_eq!(wallet.calls("getblockhash"), 1);
        assert_eq!(entropy.cached_hash_count().await, 1);
    }

    #[tokio::test]
    async fn test_height_above_tip_is_rejected() {
        let wallet = Arc::new(MockWallet::with_blocks(["a0", "a1"]));
        let entropy = source(&wallet, None, 16);

        let err = entropy.block_hash(2).await.unwrap_err();
        assert_eq!(err, EntropyError::InvalidHeight { height: 2, tip: 1 });
        assert_eq!(wallet.calls("getblockhash"), 0);
    }

    #[tokio::test]
    async fn test_hash_cache_evicts_least_recently_used() {
        let wallet = Arc::new(MockWallet::with_blocks(["a0", "a1", "a2"]));
        let entropy = source(&wallet, None, 2);

        entropy.block_hash(0).await.unwrap();
        entropy.block_hash(1).await.unwrap();
        entropy.block_hash(0).await.unwrap(); // 0 is now most recent
        entropy.block_hash(2).await.unwrap(); // evicts 1
        assert_eq!(wallet.calls("getblockhash"), 3);
        assert_eq!(entropy.cached_hash_count().await, 2);

        entropy.block_hash(0).await.unwrap();
        assert_eq!(wallet.calls("getblockhash"), 3);
        entropy.block_hash(1).await.unwrap();
        assert_eq!(wallet.calls("getblockhash"), 4);
    }
}
