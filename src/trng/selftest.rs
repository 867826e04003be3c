//! Self-test procedure run before the TRNG is trusted.
//!
//! The procedure draws a fixed sample from the entropy source block by
//! block and asks the validator for a verdict. It runs on a blocking
//! worker and polls a [`CancelToken`] between blocks, so an abandoned
//! attempt stops touching the hardware at the next checkpoint.

use crate::source::{BitString, EntropySource, SourceError};
use crate::validation::{RandomnessValidator, Verdict, REFERENCE_BLOCK_BITS};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Cooperative cancellation flag shared between supervisor and worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Errors that abort a self-test before a verdict is reached.
#[derive(Debug, Error)]
pub enum SelfTestError {
    #[error("self-test cancelled")]
    Cancelled,
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Sample size and tolerance of the self-test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfTestConfig {
    /// Number of blocks drawn.
    pub blocks: usize,
    /// Bits per block.
    pub block_bits: usize,
    /// Failed blocks tolerated by the battery.
    pub allowed_failures: usize,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            blocks: 4,
            block_bits: REFERENCE_BLOCK_BITS,
            allowed_failures: 1,
        }
    }
}

/// The self-test procedure.
#[derive(Debug, Clone)]
pub struct SelfTest {
    blocks: usize,
    block_bits: usize,
}

impl SelfTest {
    pub fn new(config: &SelfTestConfig) -> Self {
        Self {
            blocks: config.blocks.max(1),
            block_bits: config.block_bits.max(1),
        }
    }

    /// Total bits drawn per run.
    pub fn sample_bits(&self) -> usize {
        self.blocks * self.block_bits
    }

    /// Draws the sample and evaluates it.
    ///
    /// The source lock is taken per block so a cancelled run releases the
    /// hardware promptly.
    pub fn run<S>(
        &self,
        source: &Mutex<S>,
        validator: &dyn RandomnessValidator,
        cancel: &CancelToken,
    ) -> Result<Verdict, SelfTestError>
    where
        S: EntropySource + ?Sized,
    {
        let mut sample = BitString::from_bytes(Vec::with_capacity(self.sample_bits() / 8));

        for block in 0..self.blocks {
            if cancel.is_cancelled() {
                tracing::debug!(block, "Self-test cancelled before block");
                return Err(SelfTestError::Cancelled);
            }

            let bits = {
                let mut source = source
                    .lock()
                    .map_err(|_| SourceError::Unavailable("entropy source lock poisoned".to_string()))?;
                if !source.is_available() {
                    return Err(SelfTestError::Source(SourceError::Unavailable(
                        "entropy source reports no hardware".to_string(),
                    )));
                }
                source.read_bits(self.block_bits)?
            };
            sample.extend(&bits);
        }

        if cancel.is_cancelled() {
            return Err(SelfTestError::Cancelled);
        }

        Ok(validator.evaluate(&sample))
    }
}

impl Default for SelfTest {
    fn default() -> Self {
        Self::new(&SelfTestConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;
    use crate::validation::{BatteryValidator, QualityThresholds};

    fn small_test() -> SelfTest {
        SelfTest::new(&SelfTestConfig {
            blocks: 2,
            block_bits: 20_000,
            allowed_failures: 1,
        })
    }

    #[test]
    fn test_random_source_passes() {
        let source = Mutex::new(MockSource::new(17));
        let validator = BatteryValidator::new(QualityThresholds::permissive());

        let verdict = small_test()
            .run(&source, &validator, &CancelToken::new())
            .unwrap();

        assert!(verdict.passed);
        assert_eq!(source.lock().unwrap().bits_served(), 40_000);
    }

    #[test]
    fn test_cancelled_before_start() {
        let source = Mutex::new(MockSource::new(17));
        let validator = BatteryValidator::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = small_test().run(&source, &validator, &cancel);

        assert!(matches!(result, Err(SelfTestError::Cancelled)));
        assert_eq!(source.lock().unwrap().bits_served(), 0);
    }

    #[test]
    fn test_source_fault_aborts() {
        let source = Mutex::new(MockSource::new(17).fail_after(30_000));
        let validator = BatteryValidator::default();

        let result = small_test().run(&source, &validator, &CancelToken::new());

        assert!(matches!(result, Err(SelfTestError::Source(_))));
    }

    #[test]
    fn test_unavailable_source_is_not_read() {
        let source = Mutex::new(MockSource::unavailable());
        let validator = BatteryValidator::default();

        let result = small_test().run(&source, &validator, &CancelToken::new());

        assert!(matches!(
            result,
            Err(SelfTestError::Source(SourceError::Unavailable(ref cause))) if cause.contains("no hardware")
        ));
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
