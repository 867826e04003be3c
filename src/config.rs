//! Service configuration.
//!
//! Timeouts and limits are fixed at startup; nothing here can be changed
//! by a client request.

use crate::source::{
    ConditionedSource, EntropySource, HashAlgorithm, MockSource, PendulumConfig, PendulumSensor,
    SourceError,
};
use crate::trng::{ManagerConfig, RequestLimits, SelfTestConfig};
use crate::validation::{BatteryValidator, QualityThresholds, MIN_BLOCK_BITS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address '{0}'")]
    InvalidBindAddr(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("self-test blocks must hold at least {} bits", MIN_BLOCK_BITS)]
    BlockTooSmall,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub manager: ManagerSection,
    #[serde(default)]
    pub self_test: SelfTestConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub thresholds: QualityThresholds,
}

/// HTTP facade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_addr: String,
    /// Allow any origin (the service is called from browser dashboards).
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5520".to_string(),
            cors_permissive: true,
        }
    }
}

/// Lifecycle manager timeouts and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSection {
    /// Self-test deadline in milliseconds.
    pub init_timeout_ms: u64,
    /// Generation draw deadline in milliseconds.
    pub generation_timeout_ms: u64,
    pub limits: RequestLimits,
}

impl Default for ManagerSection {
    fn default() -> Self {
        Self {
            init_timeout_ms: 60_000,
            generation_timeout_ms: 30_000,
            limits: RequestLimits::default(),
        }
    }
}

/// Which entropy source backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Simulated pendulum digitizer with hash conditioning.
    #[default]
    Pendulum,
    /// Seeded ChaCha20 stream (not random; for demos and tests).
    Mock,
}

/// Entropy source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Conditioning hash for the pendulum source.
    pub algorithm: HashAlgorithm,
    /// Raw readings hashed into each 256-bit conditioned block.
    pub readings_per_block: usize,
    pub pendulum: PendulumConfig,
    /// Seed of the mock source.
    pub mock_seed: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            algorithm: HashAlgorithm::default(),
            readings_per_block: 128,
            pendulum: PendulumConfig::default(),
            mock_seed: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr(self.server.bind_addr.clone()))?;

        let nonzero = [
            ("manager.init_timeout_ms", self.manager.init_timeout_ms),
            ("manager.generation_timeout_ms", self.manager.generation_timeout_ms),
            ("manager.limits.max_quantity", self.manager.limits.max_quantity),
            ("manager.limits.max_bit_length", self.manager.limits.max_bit_length),
            ("manager.limits.max_total_bits", self.manager.limits.max_total_bits),
            ("self_test.blocks", self.self_test.blocks as u64),
            ("source.readings_per_block", self.source.readings_per_block as u64),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        if self.self_test.block_bits < MIN_BLOCK_BITS {
            return Err(ConfigError::BlockTooSmall);
        }
        Ok(())
    }

    /// Builds the manager configuration.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            init_timeout: Duration::from_millis(self.manager.init_timeout_ms),
            generation_timeout: Duration::from_millis(self.manager.generation_timeout_ms),
            self_test: self.self_test.clone(),
            limits: self.manager.limits.clone(),
        }
    }

    /// Builds the validator used by the self-test.
    pub fn validator(&self) -> BatteryValidator {
        BatteryValidator::with_blocks(
            self.thresholds.clone(),
            self.self_test.block_bits,
            self.self_test.allowed_failures,
        )
    }

    /// Opens the configured entropy source.
    pub fn open_source(&self) -> Result<Box<dyn EntropySource>, SourceError> {
        Ok(match self.source.kind {
            SourceKind::Mock => Box::new(MockSource::new(self.source.mock_seed)),
            SourceKind::Pendulum => Box::new(ConditionedSource::new(
                PendulumSensor::new(self.source.pendulum.clone()),
                self.source.algorithm,
                self.source.readings_per_block,
            )?),
        })
    }
}
