//! Self-test verdicts for the entropy source.
//!
//! This module provides the validator abstraction the lifecycle manager
//! consults before trusting the hardware, and a statistical battery that
//! implements it. These are sanity checks, not proofs of entropy.

mod statistics;
mod threshold;
mod validator;

pub use statistics::{StatisticalTests, RUN_BUCKETS};
pub use threshold::{QualityThresholds, ThresholdViolation, MIN_BLOCK_BITS, REFERENCE_BLOCK_BITS};
pub use validator::{BatteryValidator, RandomnessValidator, Verdict};
