//! The TRNG lifecycle manager.
//!
//! One manager exists per process. It owns the lifecycle state behind a
//! mutex, runs the self-test on a blocking worker under a deadline, and
//! serves generation requests only while `Ready`.
//!
//! Every accepted `initialize()` opens a new attempt with an increasing
//! id. Results are applied through `resolve`, which only
//! accepts the result for the current attempt while the state is still
//! `Initializing`. A worker that outlives its deadline therefore cannot
//! flip the state when it eventually finishes.

use super::{
    error::TrngError,
    request::{GenerationRequest, RequestLimits},
    selftest::{CancelToken, SelfTest, SelfTestConfig},
    state::{InitOutcome, LifecycleState},
};
use crate::source::{BitString, EntropySource, SourceError};
use crate::validation::{RandomnessValidator, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Entropy source shared between the manager and its workers.
type SharedSource = Arc<Mutex<dyn EntropySource>>;

/// Fixed operating parameters of the manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Bound on the self-test duration.
    pub init_timeout: Duration,
    /// Bound on a single generation draw.
    pub generation_timeout: Duration,
    /// Self-test sample size.
    pub self_test: SelfTestConfig,
    /// Request size limits applied by the request layer.
    pub limits: RequestLimits,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(60),
            generation_timeout: Duration::from_secs(30),
            self_test: SelfTestConfig::default(),
            limits: RequestLimits::default(),
        }
    }
}

/// Monotonic operation counters.
#[derive(Debug, Default)]
pub struct ManagerStats {
    init_attempts: AtomicU64,
    init_passed: AtomicU64,
    init_failed: AtomicU64,
    init_timeouts: AtomicU64,
    stale_results: AtomicU64,
    generate_requests: AtomicU64,
    generate_failures: AtomicU64,
    bits_generated: AtomicU64,
}

/// Point-in-time copy of [`ManagerStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub init_attempts: u64,
    pub init_passed: u64,
    pub init_failed: u64,
    pub init_timeouts: u64,
    pub stale_results: u64,
    pub generate_requests: u64,
    pub generate_failures: u64,
    pub bits_generated: u64,
}

impl ManagerStats {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            init_attempts: load(&self.init_attempts),
            init_passed: load(&self.init_passed),
            init_failed: load(&self.init_failed),
            init_timeouts: load(&self.init_timeouts),
            stale_results: load(&self.stale_results),
            generate_requests: load(&self.generate_requests),
            generate_failures: load(&self.generate_failures),
            bits_generated: load(&self.bits_generated),
        }
    }
}

/// Externally visible lifecycle summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: LifecycleState,
    /// Id of the latest attempt (0 before the first `initialize()`).
    pub attempt: u64,
    pub last_outcome: Option<InitOutcome>,
    /// When the state last changed.
    pub since: DateTime<Utc>,
}

/// Result of offering an attempt result to the lifecycle.
#[derive(Debug)]
enum Resolution {
    Applied(Result<InitOutcome, TrngError>),
    Stale,
}

/// Mutable lifecycle data, guarded by the manager's mutex.
#[derive(Debug)]
struct Lifecycle {
    state: LifecycleState,
    attempt: u64,
    since: DateTime<Utc>,
    last_outcome: Option<InitOutcome>,
    last_error: Option<TrngError>,
}

impl Lifecycle {
    fn transition(&mut self, to: LifecycleState) {
        tracing::info!(from = %self.state, to = %to, attempt = self.attempt, "State transition");
        self.state = to;
        self.since = Utc::now();
    }
}

/// Lifecycle manager for the TRNG.
pub struct TrngManager {
    lifecycle: Mutex<Lifecycle>,
    source: SharedSource,
    validator: Arc<dyn RandomnessValidator>,
    self_test: SelfTest,
    config: ManagerConfig,
    stats: ManagerStats,
}

impl TrngManager {
    /// Creates the manager in `Standby`.
    ///
    /// Call once at startup and share the returned handle.
    pub fn new<S, V>(source: S, validator: V, config: ManagerConfig) -> Arc<Self>
    where
        S: EntropySource + 'static,
        V: RandomnessValidator + 'static,
    {
        Arc::new(Self {
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Standby,
                attempt: 0,
                since: Utc::now(),
                last_outcome: None,
                last_error: None,
            }),
            source: Arc::new(Mutex::new(source)),
            validator: Arc::new(validator),
            self_test: SelfTest::new(&config.self_test),
            config,
            stats: ManagerStats::default(),
        })
    }

    /// Returns the manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle().state
    }

    /// Returns a summary of the lifecycle.
    pub fn status(&self) -> StatusReport {
        let lifecycle = self.lifecycle();
        StatusReport {
            state: lifecycle.state,
            attempt: lifecycle.attempt,
            last_outcome: lifecycle.last_outcome.clone(),
            since: lifecycle.since,
        }
    }

    /// Returns the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The state is only written in short sections that cannot panic
    /// halfway, so a poisoned lock still guards a consistent value.
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the bounded self-test and moves to `Ready` on success.
    ///
    /// Fails with `AlreadyRunning` unless the state is `Standby` or
    /// `Error`. The attempt is supervised by its own task, so it is
    /// resolved even if the returned future is dropped.
    pub async fn initialize(self: &Arc<Self>) -> Result<InitOutcome, TrngError> {
        let attempt = self.begin_attempt()?;

        let manager = Arc::clone(self);
        let supervisor = tokio::spawn(async move { manager.supervise(attempt).await });

        match supervisor.await {
            Ok(result) => result,
            Err(e) => {
                let error = TrngError::HardwareFailure(format!("self-test supervisor aborted: {}", e));
                self.settle(attempt, Err(error))
            }
        }
    }

    fn begin_attempt(&self) -> Result<u64, TrngError> {
        let mut lifecycle = self.lifecycle();
        if !lifecycle.state.is_standby() {
            tracing::debug!(state = %lifecycle.state, "Initialization rejected");
            return Err(TrngError::AlreadyRunning);
        }

        lifecycle.attempt += 1;
        lifecycle.transition(LifecycleState::Initializing);
        ManagerStats::bump(&self.stats.init_attempts, 1);

        tracing::info!(
            attempt = lifecycle.attempt,
            sample_bits = self.self_test.sample_bits(),
            timeout_secs = self.config.init_timeout.as_secs_f64(),
            "Self-test started"
        );
        Ok(lifecycle.attempt)
    }

    async fn supervise(self: Arc<Self>, attempt: u64) -> Result<InitOutcome, TrngError> {
        let cancel = CancelToken::new();

        let worker = {
            let manager = Arc::clone(&self);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                let result = manager
                    .self_test
                    .run(&*manager.source, manager.validator.as_ref(), &cancel)
                    .map_err(|e| TrngError::HardwareFailure(e.to_string()))
                    .and_then(Self::judge);
                manager.resolve(attempt, result)
            })
        };

        match tokio::time::timeout(self.config.init_timeout, worker).await {
            Ok(Ok(Resolution::Applied(result))) => result,
            Ok(Ok(Resolution::Stale)) => self.result_of(attempt),
            Ok(Err(e)) => {
                let error = TrngError::HardwareFailure(format!("self-test worker failed: {}", e));
                self.settle(attempt, Err(error))
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!(attempt, "Self-test exceeded its deadline; abandoning worker");
                self.settle(attempt, Err(TrngError::InitTimeout(self.config.init_timeout)))
            }
        }
    }

    /// Resolves `attempt`, or reports how it was resolved if another
    /// party got there first.
    fn settle(&self, attempt: u64, result: Result<Verdict, TrngError>) -> Result<InitOutcome, TrngError> {
        match self.resolve(attempt, result) {
            Resolution::Applied(result) => result,
            Resolution::Stale => self.result_of(attempt),
        }
    }

    fn judge(verdict: Verdict) -> Result<Verdict, TrngError> {
        if verdict.passed {
            Ok(verdict)
        } else {
            Err(TrngError::HardwareFailure(
                verdict.cause.unwrap_or_else(|| "self-test failed".to_string()),
            ))
        }
    }

    /// Applies the result of `attempt` if it is still the pending one.
    fn resolve(&self, attempt: u64, result: Result<Verdict, TrngError>) -> Resolution {
        let mut lifecycle = self.lifecycle();

        if lifecycle.attempt != attempt || lifecycle.state != LifecycleState::Initializing {
            ManagerStats::bump(&self.stats.stale_results, 1);
            tracing::warn!(
                attempt,
                current_attempt = lifecycle.attempt,
                state = %lifecycle.state,
                passed = result.is_ok(),
                "Discarding stale self-test result"
            );
            return Resolution::Stale;
        }

        let outcome = InitOutcome {
            attempt,
            passed: result.is_ok(),
            cause: match &result {
                Ok(verdict) => verdict.cause.clone(),
                Err(e) => Some(e.to_string()),
            },
            finished_at: Utc::now(),
        };
        lifecycle.last_outcome = Some(outcome.clone());

        let result = match result {
            Ok(_) => {
                ManagerStats::bump(&self.stats.init_passed, 1);
                lifecycle.last_error = None;
                lifecycle.transition(LifecycleState::Ready);
                tracing::info!(attempt, "Self-test passed; TRNG ready");
                Ok(outcome)
            }
            Err(error) => {
                let counter = match &error {
                    TrngError::InitTimeout(_) => &self.stats.init_timeouts,
                    _ => &self.stats.init_failed,
                };
                ManagerStats::bump(counter, 1);
                lifecycle.last_error = Some(error.clone());
                lifecycle.transition(LifecycleState::Error);
                tracing::warn!(attempt, kind = error.kind(), error = %error, "Self-test did not pass");
                Err(error)
            }
        };

        Resolution::Applied(result)
    }

    /// Reconstructs the recorded result of a resolved attempt.
    fn result_of(&self, attempt: u64) -> Result<InitOutcome, TrngError> {
        let lifecycle = self.lifecycle();
        match &lifecycle.last_outcome {
            Some(outcome) if outcome.attempt == attempt => match &lifecycle.last_error {
                Some(error) => Err(error.clone()),
                None => Ok(outcome.clone()),
            },
            _ => Err(TrngError::HardwareFailure(format!(
                "self-test attempt {} was superseded",
                attempt
            ))),
        }
    }

    /// Moves `Ready` to `Standby`.
    ///
    /// Generations already in flight run to completion.
    pub fn shutdown(&self) -> Result<(), TrngError> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != LifecycleState::Ready {
            tracing::debug!(state = %lifecycle.state, "Shutdown rejected");
            return Err(TrngError::AlreadyStandby);
        }
        lifecycle.transition(LifecycleState::Standby);
        Ok(())
    }

    /// Draws `quantity` fresh bit strings and hex-encodes them.
    ///
    /// Eligibility is decided under the state lock; the draw itself runs
    /// outside it, serialized on the source. Failures never change state.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>, TrngError> {
        ManagerStats::bump(&self.stats.generate_requests, 1);

        if self.state() != LifecycleState::Ready {
            return Err(TrngError::NotReady);
        }

        match self.draw(*request).await {
            Ok(values) => {
                ManagerStats::bump(&self.stats.bits_generated, request.total_bits() as u64);
                tracing::debug!(
                    quantity = request.quantity(),
                    bit_length = request.bit_length(),
                    "Generated random bits"
                );
                Ok(values)
            }
            Err(error) => {
                ManagerStats::bump(&self.stats.generate_failures, 1);
                let error = TrngError::GenerationError(error);
                tracing::warn!(kind = error.kind(), error = %error, "Generation failed");
                Err(error)
            }
        }
    }

    /// Draws and encodes on a blocking thread; the deadline covers both.
    async fn draw(&self, request: GenerationRequest) -> Result<Vec<String>, SourceError> {
        let source = Arc::clone(&self.source);
        let worker = tokio::task::spawn_blocking(move || {
            let n = request.total_bits();
            let bits = {
                let mut source = source
                    .lock()
                    .map_err(|_| SourceError::Unavailable("entropy source lock poisoned".to_string()))?;
                if !source.is_available() {
                    return Err(SourceError::Unavailable(
                        "entropy source reports no hardware".to_string(),
                    ));
                }
                source.read_bits(n)?
            };

            if bits.len() != n {
                return Err(SourceError::ReadFailed(format!(
                    "short read: got {} of {} bits",
                    bits.len(),
                    n
                )));
            }

            let values: Vec<String> = bits
                .groups(request.bit_length())
                .iter()
                .map(BitString::to_hex)
                .collect();
            debug_assert!(values.iter().all(|v| v.len() == request.hex_length()));
            Ok(values)
        });

        let timeout = self.config.generation_timeout;
        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(SourceError::ReadFailed(e.to_string())),
            Err(_) => Err(SourceError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;
    use std::sync::atomic::AtomicUsize;

    /// Validator with a scripted verdict and per-call delays.
    struct ScriptedValidator {
        passed: bool,
        delays: Vec<Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedValidator {
        fn passing() -> Self {
            Self::with_delays(true, Vec::new())
        }

        fn failing() -> Self {
            Self::with_delays(false, Vec::new())
        }

        fn with_delays(passed: bool, delays: Vec<Duration>) -> Self {
            Self {
                passed,
                delays,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RandomnessValidator for ScriptedValidator {
        fn evaluate(&self, _sample: &BitString) -> Verdict {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(call) {
                std::thread::sleep(*delay);
            }
            if self.passed {
                Verdict::pass()
            } else {
                Verdict::fail("scripted failure")
            }
        }
    }

    fn config() -> ManagerConfig {
        ManagerConfig {
            init_timeout: Duration::from_millis(500),
            generation_timeout: Duration::from_millis(500),
            self_test: SelfTestConfig {
                blocks: 1,
                block_bits: 1024,
                allowed_failures: 0,
            },
            limits: RequestLimits::default(),
        }
    }

    fn request(quantity: i64, bit_length: i64) -> GenerationRequest {
        GenerationRequest::new(quantity, bit_length, &RequestLimits::default()).unwrap()
    }

    async fn ready_manager() -> Arc<TrngManager> {
        let manager = TrngManager::new(MockSource::new(1), ScriptedValidator::passing(), config());
        manager.initialize().await.unwrap();
        manager
    }

    #[tokio::test]
    async fn test_starts_in_standby() {
        let manager = TrngManager::new(MockSource::new(1), ScriptedValidator::passing(), config());
        assert_eq!(manager.state(), LifecycleState::Standby);
        assert_eq!(manager.status().attempt, 0);
    }

    #[tokio::test]
    async fn test_initialize_passes_to_ready() {
        let manager = TrngManager::new(MockSource::new(1), ScriptedValidator::passing(), config());

        let outcome = manager.initialize().await.unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.attempt, 1);
        assert_eq!(manager.state(), LifecycleState::Ready);
        assert_eq!(manager.stats().init_passed, 1);
    }

    #[tokio::test]
    async fn test_failed_self_test_returns_to_standby() {
        let manager = TrngManager::new(MockSource::new(1), ScriptedValidator::failing(), config());

        let result = manager.initialize().await;

        assert!(matches!(result, Err(TrngError::HardwareFailure(ref cause)) if cause.contains("scripted")));
        assert_eq!(manager.state(), LifecycleState::Error);
        assert!(manager.state().is_standby());
        assert_eq!(manager.stats().init_failed, 1);
    }

    #[tokio::test]
    async fn test_source_fault_is_hardware_failure() {
        let manager = TrngManager::new(MockSource::unavailable(), ScriptedValidator::passing(), config());

        let result = manager.initialize().await;

        assert!(matches!(result, Err(TrngError::HardwareFailure(_))));
        assert!(manager.state().is_standby());
    }

    #[tokio::test]
    async fn test_initialize_rejected_when_ready() {
        let manager = ready_manager().await;

        assert!(matches!(manager.initialize().await, Err(TrngError::AlreadyRunning)));
        assert_eq!(manager.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_only_one_runs() {
        let validator = ScriptedValidator::with_delays(true, vec![Duration::from_millis(100)]);
        let manager = TrngManager::new(MockSource::new(1), validator, config());

        let (first, second) = tokio::join!(manager.initialize(), manager.initialize());

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(TrngError::AlreadyRunning)))
                .count(),
            1
        );
        assert_eq!(manager.state(), LifecycleState::Ready);
        assert_eq!(manager.stats().init_attempts, 1);
    }

    #[tokio::test]
    async fn test_timeout_discards_late_pass() {
        let validator = ScriptedValidator::with_delays(true, vec![Duration::from_millis(300)]);
        let config = ManagerConfig {
            init_timeout: Duration::from_millis(50),
            ..config()
        };
        let manager = TrngManager::new(MockSource::new(1), validator, config);

        let result = manager.initialize().await;
        assert!(matches!(result, Err(TrngError::InitTimeout(_))));
        assert!(manager.state().is_standby());

        // Let the abandoned worker finish; its pass must not be adopted.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(manager.state(), LifecycleState::Error);
        assert_eq!(manager.stats().init_timeouts, 1);
        assert_eq!(manager.stats().stale_results, 1);

        // A fresh attempt (fast this time) still works.
        let outcome = manager.initialize().await.unwrap();
        assert_eq!(outcome.attempt, 2);
        assert_eq!(manager.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_late_pass_does_not_leak_into_next_attempt() {
        // Worker 1 finishes at ~300ms, while attempt 2 (200ms..400ms) is pending.
        let validator = ScriptedValidator::with_delays(
            true,
            vec![Duration::from_millis(300), Duration::from_millis(600)],
        );
        let config = ManagerConfig {
            init_timeout: Duration::from_millis(200),
            ..config()
        };
        let manager = TrngManager::new(MockSource::new(1), validator, config);

        assert!(matches!(manager.initialize().await, Err(TrngError::InitTimeout(_))));

        let second = manager.initialize().await;
        assert!(matches!(second, Err(TrngError::InitTimeout(_))));
        assert_eq!(manager.status().attempt, 2);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(manager.state(), LifecycleState::Error);
        assert_eq!(manager.stats().stale_results, 2);
        assert_eq!(manager.stats().init_passed, 0);
    }

    #[tokio::test]
    async fn test_stale_attempt_is_fenced() {
        let manager = ready_manager().await;

        // Attempt 1 is already resolved; a repeated result is discarded.
        let resolution = manager.resolve(1, Err(TrngError::HardwareFailure("late".into())));
        assert!(matches!(resolution, Resolution::Stale));
        assert_eq!(manager.state(), LifecycleState::Ready);

        // Unknown attempt ids are discarded too.
        let resolution = manager.resolve(7, Ok(Verdict::pass()));
        assert!(matches!(resolution, Resolution::Stale));
        assert_eq!(manager.stats().stale_results, 2);
    }

    #[tokio::test]
    async fn test_dropped_initialize_still_resolves() {
        let validator = ScriptedValidator::with_delays(true, vec![Duration::from_millis(100)]);
        let manager = TrngManager::new(MockSource::new(1), validator, config());

        {
            let pending = manager.initialize();
            // Poll until the attempt has started, then drop the future.
            let _ = tokio::time::timeout(Duration::from_millis(10), pending).await;
        }
        assert_eq!(manager.state(), LifecycleState::Initializing);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(manager.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_shutdown_twice() {
        let manager = ready_manager().await;

        assert!(manager.shutdown().is_ok());
        assert_eq!(manager.state(), LifecycleState::Standby);
        assert!(matches!(manager.shutdown(), Err(TrngError::AlreadyStandby)));
    }

    #[tokio::test]
    async fn test_shutdown_rejected_while_initializing() {
        let validator = ScriptedValidator::with_delays(true, vec![Duration::from_millis(100)]);
        let manager = TrngManager::new(MockSource::new(1), validator, config());

        let pending = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(manager.state(), LifecycleState::Initializing);
        assert!(matches!(manager.shutdown(), Err(TrngError::AlreadyStandby)));
        assert!(pending.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_generate_requires_ready() {
        let manager = TrngManager::new(MockSource::new(1), ScriptedValidator::passing(), config());
        assert!(matches!(
            manager.generate(&request(5, 8)).await,
            Err(TrngError::NotReady)
        ));

        let manager = ready_manager().await;
        manager.shutdown().unwrap();
        assert!(matches!(
            manager.generate(&request(1, 1)).await,
            Err(TrngError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_generate_refused_while_initializing() {
        let validator = ScriptedValidator::with_delays(true, vec![Duration::from_millis(100)]);
        let manager = TrngManager::new(MockSource::new(1), validator, config());

        let pending = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(manager.state(), LifecycleState::Initializing);
        assert!(matches!(
            manager.generate(&request(1, 8)).await,
            Err(TrngError::NotReady)
        ));
        assert!(pending.await.unwrap().is_ok());
        assert_eq!(manager.generate(&request(1, 8)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_refused_after_failed_self_test() {
        let manager = TrngManager::new(MockSource::new(1), ScriptedValidator::failing(), config());
        assert!(manager.initialize().await.is_err());
        assert_eq!(manager.state(), LifecycleState::Error);

        assert!(matches!(
            manager.generate(&request(2, 8)).await,
            Err(TrngError::NotReady)
        ));
        assert_eq!(manager.stats().bits_generated, 0);
    }

    #[tokio::test]
    async fn test_generate_bytes() {
        let manager = ready_manager().await;

        let values = manager.generate(&request(5, 8)).await.unwrap();

        assert_eq!(values.len(), 5);
        for value in &values {
            assert_eq!(value.len(), 2);
            assert!(u8::from_str_radix(value, 16).is_ok());
        }
    }

    #[tokio::test]
    async fn test_generate_unaligned_lengths() {
        let manager = ready_manager().await;

        let values = manager.generate(&request(3, 10)).await.unwrap();

        assert_eq!(values.len(), 3);
        for value in &values {
            assert_eq!(value.len(), 3);
            let lead = u8::from_str_radix(&value[..1], 16).unwrap();
            assert!(lead < 4);
        }
    }

    #[tokio::test]
    async fn test_generate_draws_fresh_bits() {
        let manager = ready_manager().await;
        let before = manager.stats().bits_generated;

        let first = manager.generate(&request(4, 64)).await.unwrap();
        let second = manager.generate(&request(4, 64)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.stats().bits_generated - before, 512);
    }

    #[tokio::test]
    async fn test_generation_fault_keeps_ready() {
        // Enough bits for the self-test, then the hardware goes away.
        let source = MockSource::new(1).fail_after(1024 + 16);
        let manager = TrngManager::new(source, ScriptedValidator::passing(), config());
        manager.initialize().await.unwrap();

        assert!(manager.generate(&request(1, 16)).await.is_ok());
        assert!(matches!(
            manager.generate(&request(1, 16)).await,
            Err(TrngError::GenerationError(SourceError::Unavailable(_)))
        ));
        assert_eq!(manager.state(), LifecycleState::Ready);
        assert_eq!(manager.stats().generate_failures, 1);
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let config = ManagerConfig {
            generation_timeout: Duration::from_millis(50),
            ..config()
        };
        // The self-test also pays the delay, but within its own bound.
        let source = MockSource::new(1).with_delay(Duration::from_millis(150));
        let manager = TrngManager::new(source, ScriptedValidator::passing(), config);
        manager.initialize().await.unwrap();

        assert!(matches!(
            manager.generate(&request(1, 8)).await,
            Err(TrngError::GenerationError(SourceError::Timeout(_)))
        ));
        assert_eq!(manager.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_generation_in_flight_survives_shutdown() {
        let source = MockSource::new(1).with_delay(Duration::from_millis(100));
        let manager = TrngManager::new(source, ScriptedValidator::passing(), config());
        manager.initialize().await.unwrap();

        let in_flight = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.generate(&request(2, 8)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.shutdown().unwrap();

        let values = in_flight.await.unwrap().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(manager.state(), LifecycleState::Standby);
    }
}
