//! Prometheus metrics for the TRNG service.
//!
//! The registry is refreshed from the manager's counters whenever it is
//! scraped, so the manager itself never touches Prometheus types.
//!
//! # Metrics Exposed
//!
//! ## Lifecycle
//! - `trng_lifecycle_state` - 0=standby, 1=initializing, 2=ready, 3=error
//! - `trng_init_attempt` - Id of the latest initialization attempt
//!
//! ## Initialization
//! - `trng_init_attempts_total` - Attempts started
//! - `trng_init_passed_total` - Attempts that reached `Ready`
//! - `trng_init_failed_total` - Attempts that failed or faulted
//! - `trng_init_timeouts_total` - Attempts abandoned at the deadline
//! - `trng_stale_results_total` - Late self-test results that were discarded
//!
//! ## Generation
//! - `trng_generate_requests_total` - Requests received
//! - `trng_generate_failures_total` - Requests failed at the source
//! - `trng_bits_generated_total` - Bits handed out
//!
//! # Example
//!
//! ```no_run
//! use pendulum_trng::metrics::{MetricsRegistry, MetricsSnapshot};
//! # fn demo(manager: &pendulum_trng::TrngManager) {
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot::from_manager(manager));
//! println!("{}", registry.encode().unwrap());
//! # }
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
