//! Acceptance thresholds for the statistical battery.
//!
//! Defaults are the FIPS 140-2 power-up bounds for a 20 000 bit block.
//! Run-count intervals are scaled linearly for other block sizes.

use super::statistics::{StatisticalTests, RUN_BUCKETS};
use serde::{Deserialize, Serialize};

/// Block size the run-count intervals are expressed for.
pub const REFERENCE_BLOCK_BITS: usize = 20_000;

/// Smallest block the battery will judge.
pub const MIN_BLOCK_BITS: usize = 1_000;

/// Quality thresholds for the self-test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Maximum acceptable bit bias (absolute value).
    pub max_bit_bias: f64,
    /// Poker statistic must lie strictly inside this interval.
    pub poker_bounds: (f64, f64),
    /// Inclusive run-count intervals per run length, for a reference block.
    pub run_bounds: [(usize, usize); RUN_BUCKETS],
    /// A run of this many identical bits or more fails the block.
    pub max_run_length: usize,
    /// Maximum acceptable autocorrelation (absolute value).
    pub max_autocorrelation: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            // 9725 < ones < 10275
            max_bit_bias: 0.01375,
            poker_bounds: (2.16, 46.17),
            run_bounds: [
                (2315, 2685),
                (1114, 1386),
                (527, 723),
                (240, 384),
                (103, 209),
                (103, 209),
            ],
            max_run_length: 26,
            max_autocorrelation: 0.05,
        }
    }
}

impl QualityThresholds {
    /// Creates more permissive thresholds (for testing).
    pub fn permissive() -> Self {
        Self {
            max_bit_bias: 0.05,
            poker_bounds: (0.5, 80.0),
            run_bounds: [
                (2000, 3000),
                (900, 1600),
                (400, 850),
                (150, 480),
                (50, 280),
                (50, 280),
            ],
            max_run_length: 40,
            max_autocorrelation: 0.1,
        }
    }

    /// Checks statistics against thresholds.
    pub fn check(&self, stats: &StatisticalTests) -> Result<(), ThresholdViolation> {
        if stats.sample_size < MIN_BLOCK_BITS {
            return Err(ThresholdViolation::InsufficientSample {
                observed: stats.sample_size,
                required: MIN_BLOCK_BITS,
            });
        }

        if stats.bit_bias.abs() > self.max_bit_bias {
            return Err(ThresholdViolation::BitBias {
                observed: stats.bit_bias,
                threshold: self.max_bit_bias,
            });
        }

        let (poker_low, poker_high) = self.poker_bounds;
        if stats.poker <= poker_low || stats.poker >= poker_high {
            return Err(ThresholdViolation::Poker {
                observed: stats.poker,
                low: poker_low,
                high: poker_high,
            });
        }

        let scale = stats.sample_size as f64 / REFERENCE_BLOCK_BITS as f64;
        for (bit, counts) in stats.runs.iter().enumerate() {
            for (bucket, &observed) in counts.iter().enumerate() {
                let (low, high) = self.run_bounds[bucket];
                let low = (low as f64 * scale).floor() as usize;
                let high = (high as f64 * scale).ceil() as usize;
                if observed < low || observed > high {
                    return Err(ThresholdViolation::Runs {
                        bit: bit as u8,
                        length: bucket + 1,
                        observed,
                        low,
                        high,
                    });
                }
            }
        }

        if stats.longest_run >= self.max_run_length {
            return Err(ThresholdViolation::LongRun {
                observed: stats.longest_run,
                threshold: self.max_run_length,
            });
        }

        if stats.autocorrelation.abs() > self.max_autocorrelation {
            return Err(ThresholdViolation::HighAutocorrelation {
                observed: stats.autocorrelation,
                threshold: self.max_autocorrelation,
            });
        }

        Ok(())
    }
}

/// Threshold violation types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ThresholdViolation {
    #[error("block of {observed} bits is smaller than the required {required}")]
    InsufficientSample { observed: usize, required: usize },

    #[error("bit bias {observed:.4} exceeds threshold {threshold:.4}")]
    BitBias { observed: f64, threshold: f64 },

    #[error("poker statistic {observed:.2} outside ({low:.2}, {high:.2})")]
    Poker { observed: f64, low: f64, high: f64 },

    #[error("{observed} runs of {length} '{bit}' bits outside [{low}, {high}]")]
    Runs {
        bit: u8,
        length: usize,
        observed: usize,
        low: usize,
        high: usize,
    },

    #[error("run of {observed} identical bits reaches limit {threshold}")]
    LongRun { observed: usize, threshold: usize },

    #[error("autocorrelation {observed:.4} exceeds threshold {threshold:.4}")]
    HighAutocorrelation { observed: f64, threshold: f64 },
}
