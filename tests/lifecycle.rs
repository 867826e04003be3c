//! End-to-end lifecycle tests through the public API, using the real
//! statistical battery rather than scripted verdicts.

use pendulum_trng::{
    config::{FileConfig, SourceKind},
    trng::{GenerationRequest, LifecycleState, TrngError, TrngManager},
    BitString, MockSource,
};

fn file_config(kind: SourceKind) -> FileConfig {
    let mut config = FileConfig::from_toml(
        r#"
        [manager]
        init_timeout_ms = 30000
        generation_timeout_ms = 5000

        [self_test]
        blocks = 2
        block_bits = 20000
        allowed_failures = 1

        [source.pendulum]
        seed = 42
        "#,
    )
    .unwrap();
    config.source.kind = kind;
    config
}

fn manager_for(config: &FileConfig) -> std::sync::Arc<TrngManager> {
    TrngManager::new(
        config.open_source().unwrap(),
        config.validator(),
        config.manager_config(),
    )
}

#[tokio::test]
async fn pendulum_source_passes_battery_and_generates() {
    let config = file_config(SourceKind::Pendulum);
    let manager = manager_for(&config);

    let outcome = manager.initialize().await.unwrap();
    assert!(outcome.passed);
    assert_eq!(manager.state(), LifecycleState::Ready);

    let request = GenerationRequest::new(16, 12, &config.manager.limits).unwrap();
    let values = manager.generate(&request).await.unwrap();

    assert_eq!(values.len(), 16);
    for value in &values {
        assert_eq!(value.len(), 3);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[tokio::test]
async fn mock_source_lifecycle_round_trip() {
    let config = file_config(SourceKind::Mock);
    let manager = manager_for(&config);
    let request = GenerationRequest::new(2, 64, &config.manager.limits).unwrap();

    assert!(matches!(manager.generate(&request).await, Err(TrngError::NotReady)));

    manager.initialize().await.unwrap();
    assert_eq!(manager.generate(&request).await.unwrap().len(), 2);

    manager.shutdown().unwrap();
    assert!(matches!(manager.shutdown(), Err(TrngError::AlreadyStandby)));
    assert!(matches!(manager.generate(&request).await, Err(TrngError::NotReady)));

    // Re-initialization after shutdown runs a fresh attempt.
    let outcome = manager.initialize().await.unwrap();
    assert_eq!(outcome.attempt, 2);
}

#[tokio::test]
async fn stuck_source_fails_self_test() {
    struct Stuck;

    impl pendulum_trng::EntropySource for Stuck {
        fn read_bits(&mut self, n: usize) -> Result<BitString, pendulum_trng::SourceError> {
            Ok(BitString::from_bits(std::iter::repeat(true).take(n)))
        }
    }

    let config = file_config(SourceKind::Mock);
    let manager = TrngManager::new(Stuck, config.validator(), config.manager_config());

    let result = manager.initialize().await;

    assert!(matches!(result, Err(TrngError::HardwareFailure(_))));
    assert_eq!(manager.state(), LifecycleState::Error);
    let status = manager.status();
    assert!(!status.last_outcome.unwrap().passed);
}

#[tokio::test]
async fn unavailable_hardware_reports_failure() {
    let config = file_config(SourceKind::Mock);
    let manager = TrngManager::new(
        MockSource::unavailable(),
        config.validator(),
        config.manager_config(),
    );

    assert!(matches!(
        manager.initialize().await,
        Err(TrngError::HardwareFailure(_))
    ));
    assert!(manager.state().is_standby());
}
