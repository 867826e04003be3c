//! Deterministic entropy source for tests and demos.

use super::{BitString, EntropySource, SourceError};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::time::Duration;

/// Mock source backed by a seeded ChaCha20 stream.
///
/// NOT a source of true randomness. It can be configured to fail so the
/// manager's fault paths can be exercised.
pub struct MockSource {
    rng: ChaCha20Rng,
    /// Bits served before every read fails; `None` means never fail.
    fail_after: Option<u64>,
    /// Artificial latency added to each read.
    delay: Option<Duration>,
    bits_served: u64,
}

impl MockSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            fail_after: None,
            delay: None,
            bits_served: 0,
        }
    }

    /// Creates a source whose every read fails.
    pub fn unavailable() -> Self {
        Self::new(0).fail_after(0)
    }

    /// Makes reads fail once `bits` bits have been served.
    pub fn fail_after(mut self, bits: u64) -> Self {
        self.fail_after = Some(bits);
        self
    }

    /// Adds `delay` of latency to every read.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the total bits served.
    pub fn bits_served(&self) -> u64 {
        self.bits_served
    }
}

impl EntropySource for MockSource {
    fn read_bits(&mut self, n: usize) -> Result<BitString, SourceError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if let Some(limit) = self.fail_after {
            if self.bits_served + n as u64 > limit {
                return Err(SourceError::Unavailable(format!(
                    "mock source exhausted after {} bits",
                    self.bits_served
                )));
            }
        }

        let mut bytes = vec![0u8; n.div_ceil(8)];
        self.rng.fill_bytes(&mut bytes);
        self.bits_served += n as u64;

        Ok(BitString::from_bytes_truncated(bytes, n))
    }

    fn is_available(&self) -> bool {
        self.fail_after
            .map_or(true, |limit| self.bits_served < limit)
    }
}
