//! Pass/fail verdicts over entropy samples.

use super::{
    statistics::StatisticalTests,
    threshold::{QualityThresholds, REFERENCE_BLOCK_BITS},
};
use crate::source::BitString;
use serde::Serialize;

/// Result of evaluating a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Whether the sample is acceptable.
    pub passed: bool,
    /// Diagnostic explaining a failure (or a tolerated one).
    pub cause: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            cause: None,
        }
    }

    pub fn fail(cause: impl Into<String>) -> Self {
        Self {
            passed: false,
            cause: Some(cause.into()),
        }
    }
}

/// Judges whether entropy source output is fit for use.
pub trait RandomnessValidator: Send + Sync {
    /// Evaluates a sample drawn from the entropy source.
    fn evaluate(&self, sample: &BitString) -> Verdict;
}

/// Statistical battery applied block by block.
///
/// The sample is cut into blocks of `block_bits`; each block runs the full
/// battery. The verdict fails once more than `allowed_failures` blocks
/// fail, mirroring the single-retry allowance of power-up testing.
#[derive(Debug, Clone)]
pub struct BatteryValidator {
    thresholds: QualityThresholds,
    block_bits: usize,
    allowed_failures: usize,
}

impl BatteryValidator {
    /// Creates a battery over reference-size blocks.
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self::with_blocks(thresholds, REFERENCE_BLOCK_BITS, 1)
    }

    /// Creates a battery with a custom block size and failure tolerance.
    pub fn with_blocks(
        thresholds: QualityThresholds,
        block_bits: usize,
        allowed_failures: usize,
    ) -> Self {
        Self {
            thresholds,
            block_bits: block_bits.max(1),
            allowed_failures,
        }
    }
}

impl Default for BatteryValidator {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

impl RandomnessValidator for BatteryValidator {
    fn evaluate(&self, sample: &BitString) -> Verdict {
        let blocks = sample.groups(self.block_bits);
        if blocks.is_empty() {
            return Verdict::fail(format!(
                "sample of {} bits is shorter than one {} bit block",
                sample.len(),
                self.block_bits
            ));
        }

        let mut failures = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            let stats = StatisticalTests::analyze(block);
            match self.thresholds.check(&stats) {
                Ok(()) => {
                    tracing::trace!(
                        block = index,
                        bias = stats.bit_bias,
                        poker = stats.poker,
                        longest_run = stats.longest_run,
                        "Block passed"
                    );
                }
                Err(violation) => {
                    tracing::debug!(block = index, violation = %violation, "Block failed");
                    failures.push(format!("block {}: {}", index, violation));
                }
            }
        }

        if failures.len() > self.allowed_failures {
            tracing::warn!(
                failed = failures.len(),
                blocks = blocks.len(),
                "Self-test battery failed"
            );
            return Verdict::fail(failures.join("; "));
        }

        Verdict {
            passed: true,
            cause: (!failures.is_empty()).then(|| failures.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{EntropySource, MockSource};

    fn random_sample(blocks: usize) -> BitString {
        MockSource::new(21)
            .read_bits(blocks * REFERENCE_BLOCK_BITS)
            .unwrap()
    }

    #[test]
    fn test_random_sample_passes() {
        let validator = BatteryValidator::new(QualityThresholds::permissive());
        let verdict = validator.evaluate(&random_sample(3));
        assert!(verdict.passed, "unexpected failure: {:?}", verdict.cause);
    }

    #[test]
    fn test_constant_sample_fails() {
        let validator = BatteryValidator::default();
        let verdict = validator.evaluate(&BitString::from_bytes(vec![0u8; 5000]));

        assert!(!verdict.passed);
        assert!(verdict.cause.unwrap().contains("block 0"));
    }

    #[test]
    fn test_one_bad_block_tolerated() {
        let mut sample = random_sample(2);
        sample.extend(&BitString::from_bytes(vec![0xFF; 2500]));

        let validator = BatteryValidator::with_blocks(QualityThresholds::permissive(), 20_000, 1);
        let verdict = validator.evaluate(&sample);

        assert!(verdict.passed);
        assert!(verdict.cause.unwrap().contains("block 2"));
    }

    #[test]
    fn test_short_sample_fails() {
        let validator = BatteryValidator::default();
        let verdict = validator.evaluate(&BitString::from_bytes(vec![0x5A; 10]));
        assert!(!verdict.passed);
    }
}
