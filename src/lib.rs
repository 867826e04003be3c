//! Pendulum TRNG Service Library
//!
//! Lifecycle management for a hardware true random number generator that
//! digitizes a chaotic pendulum. The hardware is only trusted after it
//! passes a statistical self-test, and random bits are only handed out
//! while it is in that verified state.
//!
//! # Architecture
//!
//! ```text
//! source (sensor → conditioning) → trng::TrngManager → api (HTTP)
//!                 ↓                        ↑
//!         validation (self-test verdict) ──┘
//! ```
//!
//! # Design Principles
//!
//! - **Fail-closed**: Generation is refused unless the last self-test passed
//! - **Bounded**: The self-test and every draw run under a deadline
//! - **Fenced**: A self-test abandoned at its deadline can never change state
//! - **No cryptographic claims**: Statistical tests are sanity checks, not proofs
//!
//! # Example
//!
//! ```no_run
//! use pendulum_trng::{
//!     source::MockSource,
//!     trng::{GenerationRequest, ManagerConfig, TrngManager},
//!     validation::BatteryValidator,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ManagerConfig::default();
//! let manager = TrngManager::new(MockSource::new(7), BatteryValidator::default(), config);
//!
//! manager.initialize().await?;
//!
//! let request = GenerationRequest::new(4, 12, &manager.config().limits)?;
//! for value in manager.generate(&request).await? {
//!     println!("{}", value);
//! }
//!
//! manager.shutdown()?;
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

#[cfg(feature = "server")]
pub mod api;
pub mod config;
pub mod metrics;
pub mod source;
pub mod trng;
pub mod validation;

// Re-export commonly used types at crate root
pub use config::{ConfigError, FileConfig};
pub use source::{BitString, EntropySource, MockSource, SourceError};
pub use trng::{GenerationRequest, LifecycleState, TrngError, TrngManager};
pub use validation::{BatteryValidator, QualityThresholds, RandomnessValidator, Verdict};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
