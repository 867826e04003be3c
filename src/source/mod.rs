//! Entropy sources.
//!
//! This module provides the abstraction the lifecycle manager draws raw
//! bits from, a packed bit buffer type, and concrete sources: a
//! deterministic mock and a conditioned pendulum sensor.

mod bits;
mod conditioning;
mod mock;
mod sensor;

pub use bits::BitString;
pub use conditioning::{ConditionedSource, Conditioner, HashAlgorithm, BLOCK_BYTES};
pub use mock::MockSource;
pub use sensor::{PendulumConfig, PendulumSensor, Sensor};

use thiserror::Error;

/// Errors that can occur while reading from an entropy source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("entropy source unavailable: {0}")]
    Unavailable(String),
    #[error("entropy source not opened")]
    NotOpen,
    #[error("failed to read from entropy source: {0}")]
    ReadFailed(String),
    #[error("entropy source did not respond within {0:?}")]
    Timeout(std::time::Duration),
}

/// Hardware producing raw random bits on demand.
///
/// Every call must return bits that were never returned before.
pub trait EntropySource: Send {
    /// Reads exactly `n` fresh bits.
    fn read_bits(&mut self, n: usize) -> Result<BitString, SourceError>;

    /// Returns false if the source is known to be unable to serve reads.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: EntropySource + ?Sized> EntropySource for Box<T> {
    fn read_bits(&mut self, n: usize) -> Result<BitString, SourceError> {
        (**self).read_bits(n)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
