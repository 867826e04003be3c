//! Statistical tests over a block of raw bits.
//!
//! These follow the FIPS 140 power-up battery: monobit, poker, runs and
//! long run, plus bias and lag-1 autocorrelation figures for diagnostics.

use crate::source::BitString;

/// Run lengths tracked individually; longer runs share the last bucket.
pub const RUN_BUCKETS: usize = 6;

/// Statistical test results for one block.
#[derive(Debug, Clone)]
pub struct StatisticalTests {
    /// Number of bits analyzed.
    pub sample_size: usize,
    /// Number of set bits.
    pub ones: usize,
    /// Bit bias (deviation from 0.5).
    pub bit_bias: f64,
    /// Poker statistic over 4-bit nibbles.
    pub poker: f64,
    /// Run counts indexed by `[bit value][run length - 1]`.
    pub runs: [[usize; RUN_BUCKETS]; 2],
    /// Longest run of identical bits.
    pub longest_run: usize,
    /// Lag-1 autocorrelation of the bit sequence.
    pub autocorrelation: f64,
}

impl StatisticalTests {
    /// Runs all statistical tests on the block.
    pub fn analyze(block: &BitString) -> Self {
        let (runs, longest_run) = Self::count_runs(block);

        Self {
            sample_size: block.len(),
            ones: block.popcount(),
            bit_bias: block.bit_bias(),
            poker: Self::compute_poker(block),
            runs,
            longest_run,
            autocorrelation: Self::compute_autocorrelation(block),
        }
    }

    /// Computes the poker statistic `X = 16/k * sum(f_i^2) - k`.
    fn compute_poker(block: &BitString) -> f64 {
        let k = block.len() / 4;
        if k == 0 {
            return 0.0;
        }

        let mut counts = [0usize; 16];
        for nibble in 0..k {
            let value = (0..4).fold(0usize, |acc, j| {
                (acc << 1) | usize::from(block.bit(nibble * 4 + j).unwrap_or(false))
            });
            counts[value] += 1;
        }

        let k = k as f64;
        let sum_sq: f64 = counts.iter().map(|&f| (f as f64).powi(2)).sum();
        16.0 / k * sum_sq - k
    }

    fn count_runs(block: &BitString) -> ([[usize; RUN_BUCKETS]; 2], usize) {
        let mut runs = [[0usize; RUN_BUCKETS]; 2];
        let mut longest = 0;
        let mut current: Option<(bool, usize)> = None;

        let mut close = |bit: bool, len: usize, runs: &mut [[usize; RUN_BUCKETS]; 2]| {
            runs[usize::from(bit)][len.min(RUN_BUCKETS) - 1] += 1;
            longest = longest.max(len);
        };

        for bit in block.iter() {
            current = match current {
                Some((value, len)) if value == bit => Some((value, len + 1)),
                Some((value, len)) => {
                    close(value, len, &mut runs);
                    Some((bit, 1))
                }
                None => Some((bit, 1)),
            };
        }
        if let Some((value, len)) = current {
            close(value, len, &mut runs);
        }

        (runs, longest)
    }

    /// Computes lag-1 autocorrelation.
    ///
    /// High values indicate predictable patterns.
    fn compute_autocorrelation(block: &BitString) -> f64 {
        if block.len() < 2 {
            return 0.0;
        }

        let n = block.len() as f64;
        let mean = block.popcount() as f64 / n;
        let centered = |bit: bool| if bit { 1.0 - mean } else { -mean };

        let variance: f64 = block.iter().map(|b| centered(b).powi(2)).sum();
        if variance == 0.0 {
            return 1.0; // All same value = perfect correlation
        }

        let mut previous = None;
        let mut covariance = 0.0;
        for bit in block.iter() {
            let value = centered(bit);
            if let Some(prev) = previous {
                covariance += prev * value;
            }
            previous = Some(value);
        }

        covariance / variance
    }
}
