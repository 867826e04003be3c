//! Cryptographic hash-based conditioning of raw sensor readings.
//!
//! Uses standard hash functions to transform biased, correlated
//! pendulum readings into uniformly distributed output bits.

use super::{BitString, EntropySource, Sensor, SourceError};
use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain separator for conditioned blocks.
const CONDITIONING_DOMAIN: &[u8] = b"pendulum-trng-condition-v1";

/// Size of one conditioned block in bytes.
pub const BLOCK_BYTES: usize = 32;

/// Supported hash algorithms for conditioning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 - fast, secure, recommended default.
    #[default]
    Blake3,
    /// SHA-256 - widely deployed, conservative choice.
    Sha256,
}

/// Hashes a batch of raw readings into one conditioned block.
pub struct Conditioner {
    algorithm: HashAlgorithm,
}

impl Conditioner {
    /// Creates a new conditioner with the specified algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Conditions `readings` into a 32-byte block.
    ///
    /// `counter` is mixed in so identical reading batches never yield
    /// identical blocks.
    pub fn condition(&self, counter: u64, readings: &[u16]) -> [u8; BLOCK_BYTES] {
        match self.algorithm {
            HashAlgorithm::Blake3 => {
                let mut hasher = Blake3Hasher::new();
                hasher.update(CONDITIONING_DOMAIN);
                hasher.update(&counter.to_le_bytes());
                for reading in readings {
                    hasher.update(&reading.to_le_bytes());
                }
                *hasher.finalize().as_bytes()
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(CONDITIONING_DOMAIN);
                hasher.update(counter.to_le_bytes());
                for reading in readings {
                    hasher.update(reading.to_le_bytes());
                }
                let result = hasher.finalize();
                let mut data = [0u8; BLOCK_BYTES];
                data.copy_from_slice(&result);
                data
            }
        }
    }
}

impl Default for Conditioner {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

/// Entropy source built from a sensor plus a conditioner.
///
/// Every conditioned block is produced from `readings_per_block` fresh
/// readings and its bits are handed out exactly once.
pub struct ConditionedSource<S: Sensor> {
    sensor: S,
    conditioner: Conditioner,
    readings_per_block: usize,
    /// Conditioned bits not yet handed out.
    pending: BitString,
    /// Blocks produced so far.
    blocks: u64,
}

impl<S: Sensor> ConditionedSource<S> {
    /// Wraps `sensor`, opening it if necessary.
    pub fn new(
        mut sensor: S,
        algorithm: HashAlgorithm,
        readings_per_block: usize,
    ) -> Result<Self, SourceError> {
        if !sensor.is_open() {
            sensor.open()?;
        }
        Ok(Self {
            sensor,
            conditioner: Conditioner::new(algorithm),
            readings_per_block: readings_per_block.max(1),
            pending: BitString::from_bytes(Vec::new()),
            blocks: 0,
        })
    }

    /// Returns the number of conditioned blocks produced.
    pub fn blocks_produced(&self) -> u64 {
        self.blocks
    }

    fn next_block(&mut self) -> Result<[u8; BLOCK_BYTES], SourceError> {
        let readings = (0..self.readings_per_block)
            .map(|_| self.sensor.sample())
            .collect::<Result<Vec<u16>, _>>()?;

        let block = self.conditioner.condition(self.blocks, &readings);
        self.blocks += 1;

        tracing::trace!(block = self.blocks, readings = readings.len(), "Conditioned block");
        Ok(block)
    }
}

impl<S: Sensor> EntropySource for ConditionedSource<S> {
    fn read_bits(&mut self, n: usize) -> Result<BitString, SourceError> {
        if !self.sensor.is_open() {
            return Err(SourceError::NotOpen);
        }

        let mut out = std::mem::replace(&mut self.pending, BitString::from_bytes(Vec::new()));
        if out.len() >= n {
            self.pending = out.slice(n, out.len() - n);
            return Ok(out.slice(0, n));
        }

        let missing_blocks = (n - out.len()).div_ceil(BLOCK_BYTES * 8);
        let mut fresh = Vec::with_capacity(missing_blocks * BLOCK_BYTES);
        for _ in 0..missing_blocks {
            fresh.extend_from_slice(&self.next_block()?);
        }
        out.extend(&BitString::from_bytes(fresh));

        self.pending = out.slice(n, out.len() - n);
        Ok(out.slice(0, n))
    }

    fn is_available(&self) -> bool {
        self.sensor.is_open()
    }
}
