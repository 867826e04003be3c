//! TRNG lifecycle management.
//!
//! The manager gates generation behind a bounded self-test:
//!
//! ```text
//! Standby --initialize()--> Initializing --passed--> Ready
//! Initializing --failed / fault / timeout--> Error (standby)
//! Ready --shutdown()--> Standby
//! ```
//!
//! `initialize()` is rejected with `AlreadyRunning` outside the standby
//! states, `shutdown()` with `AlreadyStandby` outside `Ready`, and
//! `generate()` with `NotReady` outside `Ready`.

mod error;
mod manager;
mod request;
mod selftest;
mod state;

pub use error::TrngError;
pub use manager::{ManagerConfig, ManagerStats, StatsSnapshot, StatusReport, TrngManager};
pub use request::{GenerationRequest, RequestLimits, ValidationError};
pub use selftest::{CancelToken, SelfTest, SelfTestConfig, SelfTestError};
pub use state::{InitOutcome, LifecycleState};
