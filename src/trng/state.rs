//! Lifecycle states and initialization outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Phase of the TRNG lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Idle; generation disabled. Initial state.
    Standby,
    /// Self-test in progress.
    Initializing,
    /// Self-test passed; generation enabled.
    Ready,
    /// Standby after a failed, faulted or timed-out self-test.
    Error,
}

impl LifecycleState {
    /// True for the idle states from which a new self-test may start.
    #[inline]
    pub fn is_standby(self) -> bool {
        matches!(self, Self::Standby | Self::Error)
    }

    /// Numeric code used for the state gauge.
    pub fn code(self) -> i64 {
        match self {
            Self::Standby => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Error => 3,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standby => "standby",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Result of one initialization attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitOutcome {
    /// Attempt identifier, increasing by one per accepted `initialize()`.
    pub attempt: u64,
    /// Whether the self-test passed.
    pub passed: bool,
    /// Diagnostic for failures (or tolerated block failures).
    pub cause: Option<String>,
    /// When the attempt was resolved.
    pub finished_at: DateTime<Utc>,
}
