//! Errors returned by lifecycle operations.

use crate::source::SourceError;
use std::time::Duration;
use thiserror::Error;

/// Failures of `initialize`, `shutdown` and `generate`.
#[derive(Debug, Clone, Error)]
pub enum TrngError {
    /// Generation requested outside the `Ready` state.
    #[error("system not ready; try init")]
    NotReady,

    /// `initialize` while a self-test is running or the TRNG is ready.
    #[error("system already running")]
    AlreadyRunning,

    /// `shutdown` while not `Ready`.
    #[error("system already in 'standby mode'")]
    AlreadyStandby,

    /// The self-test did not finish within the bound.
    #[error("unable to initialize the random number generator within a timeout of {} seconds", .0.as_secs_f64())]
    InitTimeout(Duration),

    /// The self-test failed or the hardware faulted during it.
    #[error("functionality not given; check hardware: {0}")]
    HardwareFailure(String),

    /// The entropy source failed during a draw.
    #[error("random number generation failed: {0}")]
    GenerationError(#[from] SourceError),
}

impl TrngError {
    /// Short machine-readable name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::AlreadyRunning => "already_running",
            Self::AlreadyStandby => "already_standby",
            Self::InitTimeout(_) => "init_timeout",
            Self::HardwareFailure(_) => "hardware_failure",
            Self::GenerationError(_) => "generation_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_distinct() {
        let errors = [
            TrngError::NotReady,
            TrngError::AlreadyRunning,
            TrngError::AlreadyStandby,
            TrngError::InitTimeout(Duration::from_secs(1)),
            TrngError::HardwareFailure("dead".into()),
            TrngError::GenerationError(SourceError::NotOpen),
        ];

        let kinds: std::collections::HashSet<_> = errors.iter().map(TrngError::kind).collect();
        assert_eq!(kinds.len(), errors.len());
        assert_eq!(TrngError::NotReady.kind(), "not_ready");
    }
}
