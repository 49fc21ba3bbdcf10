//! Card dealer
//!
//! Each attempt draws a height in `[0, tip]`, fetches that block's hash, reads
//! a 3-hex-digit window at a random offset and classifies the value (see
//! [`crate::cards`]). Rejected values and unusable hashes trigger another
//! attempt, up to `max_draw_attempts`.
//!
//! Both draws come from one RNG. Seeding it from a published [`RoundSeed`]
//! lets anyone with the seed, the tip and the chain replay the round.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cards::{CardOutcome, classify};
use crate::entropy::{BlockEntropySource, EntropyError};
use crate::wallet::WalletError;

/// Width of the digit window read from a block hash.
pub const WINDOW_LEN: usize = 3;
pub const DEFAULT_MAX_DRAW_ATTEMPTS: u32 = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DealError {
    #[error("Entropy source failed: {0}")]
    Entropy(#[from] EntropyError),

    /// Hash too short or not hex. Retried inside the dealer.
    #[error("Invalid block hash: {0}")]
    InvalidResponse(String),

    #[error("No card after {attempts} draw attempts")]
    RetriesExhausted { attempts: u32 },
}

impl DealError {
    /// Worth trying the whole deal again later.
    pub fn is_transient(&self) -> bool {
        match self {
            DealError::RetriesExhausted { .. } => true,
            DealError::Entropy(EntropyError::ServiceUnavailable(e)) => e.is_transient(),
            _ => false,
        }
    }
}

/// 32-byte seed fixing both draws of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundSeed(pub [u8; 32]);

impl RoundSeed {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for RoundSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for RoundSeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| format!("Invalid seed hex: {}", e))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("Seed must be 32 bytes, got {}", b.len()))?;
        Ok(Self(seed))
    }
}

impl Serialize for RoundSeed {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Everything needed to audit one dealt card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deal {
    pub outcome: CardOutcome,
    pub tip: u64,
    pub height: u64,
    pub block_hash: String,
    pub window_offset: usize,
    pub digits: u16,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<RoundSeed>,
}

/// Pick a window start uniformly in `[0, len - 3]` and parse it as hex.
///
/// Returns the offset and the value in `[0, 4095]`.
pub fn extract_digits<R: Rng + ?Sized>(hash: &str, rng: &mut R) -> Result<(usize, u16), DealError> {
    if hash.len() < WINDOW_LEN {
        return Err(DealError::InvalidResponse(format!(
            "hash too short ({} chars)",
            hash.len()
        )));
    }

    let offset = rng.gen_range(0..=hash.len() - WINDOW_LEN);
    let window = hash
        .get(offset..offset + WINDOW_LEN)
        .ok_or_else(|| DealError::InvalidResponse("hash is not ASCII".to_string()))?;
    let digits = u16::from_str_radix(window, 16)
        .map_err(|_| DealError::InvalidResponse(format!("non-hex window {:?}", window)))?;

    Ok((offset, digits))
}

pub struct CardDealer {
    entropy: Arc<BlockEntropySource>,
    max_attempts: u32,
}

impl CardDealer {
    pub fn new(entropy: Arc<BlockEntropySource>, max_attempts: u32) -> Self {
        Self {
            entropy,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn entropy(&self) -> &Arc<BlockEntropySource> {
        &self.entropy
    }

    /// Deal with fresh OS randomness.
    pub async fn deal_card(&self) -> Result<Deal, DealError> {
        let mut rng = StdRng::from_entropy();
        self.deal_with_rng(&mut rng).await
    }

    /// Deal reproducibly from `seed`. Same seed and tip, same card.
    pub async fn deal_with_seed(&self, seed: RoundSeed) -> Result<Deal, DealError> {
        let mut rng = StdRng::from_seed(seed.0);
        let mut deal = self.deal_with_rng(&mut rng).await?;
        deal.seed = Some(seed);
        Ok(deal)
    }

    pub async fn deal_with_rng<R: Rng + Send>(&self, rng: &mut R) -> Result<Deal, DealError> {
        let tip = self.entropy.height().await?;

        for attempt in 1..=self.max_attempts {
            let height = rng.gen_range(0..=tip);
            let block_hash = match self.entropy.block_hash(height).await {
                Ok(hash) => hash,
                // Malformed getblockhash answer: same as an unusable hash
                Err(EntropyError::ServiceUnavailable(WalletError::InvalidResponse(reason))) => {
                    warn!(height, attempt, %reason, "Malformed block hash response, drawing again");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let (window_offset, digits) = match extract_digits(&block_hash, rng) {
                Ok(drawn) => drawn,
                Err(e) => {
                    warn!(height, attempt, error = %e, "Unusable block hash, drawing again");
                    continue;
                }
            };

            match classify(digits) {
                Some(outcome) => {
                    info!(
                        card = %outcome,
                        height,
                        window_offset,
                        digits,
                        attempt,
                        "Card dealt"
                    );
                    return Ok(Deal {
                        outcome,
                        tip,
                        height,
                        block_hash,
                        window_offset,
                        digits,
                        attempts: attempt,
                        seed: None,
                    });
                }
                None => debug!(height, digits, attempt, "Rejected digits, drawing again"),
            }
        }

        warn!(attempts = self.max_attempts, "Dealer gave up");
        Err(DealError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}
