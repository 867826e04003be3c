//! Metrics collection and registry.

use crate::trng::{StatsSnapshot, TrngManager};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of manager state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Current lifecycle state code (see [`crate::trng::LifecycleState::code`]).
    pub state_code: i64,
    /// Id of the latest initialization attempt.
    pub attempt: u64,
    /// Operation counters.
    pub stats: StatsSnapshot,
}

/// Prometheus metrics registry for the TRNG service.
pub struct MetricsRegistry {
    registry: Registry,
    /// Serializes counter catch-up between concurrent scrapes.
    update_lock: Mutex<()>,

    // Lifecycle metrics
    lifecycle_state: IntGauge,
    init_attempt: IntGauge,

    // Initialization metrics
    init_attempts_total: IntCounter,
    init_passed_total: IntCounter,
    init_failed_total: IntCounter,
    init_timeouts_total: IntCounter,
    stale_results_total: IntCounter,

    // Generation metrics
    generate_requests_total: IntCounter,
    generate_failures_total: IntCounter,
    bits_generated_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all TRNG metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let lifecycle_state = IntGauge::new(
            "trng_lifecycle_state",
            "Lifecycle state (0=standby, 1=initializing, 2=ready, 3=error)",
        )?;
        let init_attempt = IntGauge::new(
            "trng_init_attempt",
            "Id of the latest initialization attempt",
        )?;

        let init_attempts_total = IntCounter::new(
            "trng_init_attempts_total",
            "Initialization attempts started",
        )?;
        let init_passed_total = IntCounter::new(
            "trng_init_passed_total",
            "Initialization attempts that passed the self-test",
        )?;
        let init_failed_total = IntCounter::new(
            "trng_init_failed_total",
            "Initialization attempts that failed the self-test or faulted",
        )?;
        let init_timeouts_total = IntCounter::new(
            "trng_init_timeouts_total",
            "Initialization attempts abandoned at the deadline",
        )?;
        let stale_results_total = IntCounter::new(
            "trng_stale_results_total",
            "Self-test results discarded because their attempt was no longer current",
        )?;

        let generate_requests_total = IntCounter::new(
            "trng_generate_requests_total",
            "Generation requests received by the manager",
        )?;
        let generate_failures_total = IntCounter::new(
            "trng_generate_failures_total",
            "Generation requests that failed at the entropy source",
        )?;
        let bits_generated_total = IntCounter::new(
            "trng_bits_generated_total",
            "Random bits handed out",
        )?;

        registry.register(Box::new(lifecycle_state.clone()))?;
        registry.register(Box::new(init_attempt.clone()))?;
        registry.register(Box::new(init_attempts_total.clone()))?;
        registry.register(Box::new(init_passed_total.clone()))?;
        registry.register(Box::new(init_failed_total.clone()))?;
        registry.register(Box::new(init_timeouts_total.clone()))?;
        registry.register(Box::new(stale_results_total.clone()))?;
        registry.register(Box::new(generate_requests_total.clone()))?;
        registry.register(Box::new(generate_failures_total.clone()))?;
        registry.register(Box::new(bits_generated_total.clone()))?;

        Ok(Self {
            registry,
            update_lock: Mutex::new(()),
            lifecycle_state,
            init_attempt,
            init_attempts_total,
            init_passed_total,
            init_failed_total,
            init_timeouts_total,
            stale_results_total,
            generate_requests_total,
            generate_failures_total,
            bits_generated_total,
        })
    }

    /// Updates all metrics from a snapshot of manager state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.lifecycle_state.set(snapshot.state_code);
        self.init_attempt.set(snapshot.attempt as i64);

        // Counters only move forward, by the difference to the snapshot
        let stats = &snapshot.stats;
        Self::advance(&self.init_attempts_total, stats.init_attempts);
        Self::advance(&self.init_passed_total, stats.init_passed);
        Self::advance(&self.init_failed_total, stats.init_failed);
        Self::advance(&self.init_timeouts_total, stats.init_timeouts);
        Self::advance(&self.stale_results_total, stats.stale_results);
        Self::advance(&self.generate_requests_total, stats.generate_requests);
        Self::advance(&self.generate_failures_total, stats.generate_failures);
        Self::advance(&self.bits_generated_total, stats.bits_generated);
    }

    fn advance(counter: &IntCounter, target: u64) {
        let current = counter.get();
        if target > current {
            counter.inc_by(target - current);
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of the manager.
    pub fn from_manager(manager: &TrngManager) -> Self {
        let status = manager.status();
        Self {
            state_code: status.state.code(),
            attempt: status.attempt,
            stats: manager.stats(),
        }
    }
}
