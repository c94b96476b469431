//! # Key Schedule
//!
//! Derives the pseudo-random order in which payload bits visit pixel-plane
//! positions. Encoder and decoder build the same schedule from the same key and
//! capacity, so bit `k` of the bitstream is always found at the `k`-th position
//! of the stream.
//!
//! ## Algorithm
//!
//! 1. `seed = HMAC-SHA256(key, "png-stego/positions/v1")`
//! 2. A `ChaCha20Rng` is seeded from those 32 bytes, fresh for every call
//! 3. A forward Fisher-Yates shuffle over `[0, capacity)` is advanced lazily:
//!    step `k` draws `j` from `k..capacity`, swaps, and yields slot `k`
//!
//! Draws use `u32` ranges rather than `usize`: `gen_range` consumes a different
//! amount of entropy per draw for 32- and 64-bit integers, which would make the
//! order depend on the target's pointer width.

use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use super::error::{Result, StegoError};

type HmacSha256 = Hmac<Sha256>;

/// Domain string mixed into the seed. Changing it changes every embedding position.
const POSITION_DOMAIN: &[u8] = b"png-stego/positions/v1";

/// Derive the 32-byte PRNG seed for a secret key.
pub fn derive_seed(key: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(POSITION_DOMAIN);
    let digest = mac.finalize().into_bytes();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    seed
}

/// A lazily shuffled permutation of `[0, capacity)`.
///
/// Iterating yields each position exactly once; the stream ends after
/// `capacity` items.
pub struct KeySchedule {
    order: Vec<u32>,
    rng: ChaCha20Rng,
    cursor: usize,
}

impl KeySchedule {
    /// Build the schedule for `key` over a carrier with `capacity` positions.
    ///
    /// # Errors
    /// - [`StegoError::EmptyCarrier`] when `capacity == 0`
    /// - [`StegoError::CarrierTooLarge`] when `capacity` does not fit in `u32`
    pub fn new(key: &[u8], capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StegoError::EmptyCarrier);
        }
        let upper = u32::try_from(capacity)
            .map_err(|_| StegoError::CarrierTooLarge { positions: capacity })?;

        Ok(Self {
            order: (0..upper).collect(),
            rng: ChaCha20Rng::from_seed(derive_seed(key)),
            cursor: 0,
        })
    }

    /// Total number of distinct positions this schedule can produce.
    pub fn capacity(&self) -> usize {
        self.order.len()
    }

    /// Positions not yet handed out.
    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    /// Take the next `count` positions, failing without advancing if fewer remain.
    pub fn take_positions(&mut self, count: usize) -> Result<Vec<usize>> {
        let available = self.remaining();
        if count > available {
            return Err(StegoError::InsufficientCapacity {
                required: count,
                available,
            });
        }
        Ok(self.by_ref().take(count).collect())
    }
}

impl Iterator for KeySchedule {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let len = self.order.len();
        if self.cursor >= len {
            return None;
        }
        let k = self.cursor;
        let j = self.rng.gen_range(k as u32..len as u32) as usize;
        self.order.swap(k, j);
        self.cursor += 1;
        Some(self.order[k] as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}
