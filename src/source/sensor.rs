//! Pendulum sensor abstraction.
//!
//! The physical TRNG digitizes the angle of a chaotic pendulum. This
//! module provides a trait over that digitizer plus a simulated pendulum
//! used when no hardware is attached.

use super::SourceError;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Trait for pendulum digitizers.
///
/// This abstraction allows swapping between real sensor hardware and
/// the simulated pendulum.
pub trait Sensor: Send {
    /// Powers up the sensor.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Reads one raw ADC sample.
    fn sample(&mut self) -> Result<u16, SourceError>;

    /// Checks if the sensor is currently open.
    fn is_open(&self) -> bool;

    /// Powers the sensor down.
    fn close(&mut self);
}

/// Physical parameters of the simulated pendulum.
///
/// The defaults put the driven damped pendulum in its chaotic regime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PendulumConfig {
    /// Damping coefficient.
    pub damping: f64,
    /// Driving force amplitude.
    pub drive_amplitude: f64,
    /// Driving angular frequency.
    pub drive_frequency: f64,
    /// Integration step in simulated seconds.
    pub time_step: f64,
    /// Integration steps between two ADC samples.
    pub steps_per_sample: u32,
    /// ADC resolution in bits (1-16).
    pub adc_bits: u8,
    /// Standard deviation of additive measurement noise, in ADC counts.
    pub noise_counts: f64,
    /// Seed for the measurement noise; drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            damping: 0.5,
            drive_amplitude: 1.2,
            drive_frequency: 2.0 / 3.0,
            time_step: 0.05,
            steps_per_sample: 7,
            adc_bits: 14,
            noise_counts: 2.0,
            seed: None,
        }
    }
}

/// Simulated chaotic pendulum digitizer.
///
/// Integrates `θ'' = -γθ' - sin θ + A cos(ωt)` with RK4 and quantizes the
/// wrapped angle, adding Gaussian-ish measurement noise from ChaCha20.
pub struct PendulumSensor {
    config: PendulumConfig,
    noise: ChaCha20Rng,
    theta: f64,
    omega: f64,
    t: f64,
    open: bool,
}

impl PendulumSensor {
    pub fn new(config: PendulumConfig) -> Self {
        let noise = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => {
                let mut seed = [0u8; 32];
                rand_core::OsRng.fill_bytes(&mut seed);
                ChaCha20Rng::from_seed(seed)
            }
        };
        Self {
            config,
            noise,
            theta: 0.2,
            omega: 0.0,
            t: 0.0,
            open: false,
        }
    }

    fn acceleration(&self, theta: f64, omega: f64, t: f64) -> f64 {
        -self.config.damping * omega - theta.sin()
            + self.config.drive_amplitude * (self.config.drive_frequency * t).cos()
    }

    fn step(&mut self) {
        let h = self.config.time_step;
        let (theta, omega, t) = (self.theta, self.omega, self.t);

        let k1t = omega;
        let k1w = self.acceleration(theta, omega, t);
        let k2t = omega + 0.5 * h * k1w;
        let k2w = self.acceleration(theta + 0.5 * h * k1t, k2t, t + 0.5 * h);
        let k3t = omega + 0.5 * h * k2w;
        let k3w = self.acceleration(theta + 0.5 * h * k2t, k3t, t + 0.5 * h);
        let k4t = omega + h * k3w;
        let k4w = self.acceleration(theta + h * k3t, k4t, t + h);

        self.theta = theta + h / 6.0 * (k1t + 2.0 * k2t + 2.0 * k3t + k4t);
        self.omega = omega + h / 6.0 * (k1w + 2.0 * k2w + 2.0 * k3w + k4w);
        self.t = t + h;
    }

    /// Approximately normal noise from the sum of four uniforms.
    fn measurement_noise(&mut self) -> f64 {
        let sum: f64 = (0..4)
            .map(|_| self.noise.next_u32() as f64 / u32::MAX as f64)
            .sum();
        (sum - 2.0) * 3.0_f64.sqrt() * self.config.noise_counts
    }
}

impl Sensor for PendulumSensor {
    fn open(&mut self) -> Result<(), SourceError> {
        let adc_bits = self.config.adc_bits;
        if adc_bits == 0 || adc_bits > 16 {
            return Err(SourceError::Unavailable(format!(
                "unsupported ADC resolution: {} bits",
                adc_bits
            )));
        }
        if self.config.time_step <= 0.0 || self.config.steps_per_sample == 0 {
            return Err(SourceError::Unavailable(
                "invalid integration parameters".to_string(),
            ));
        }
        self.open = true;
        tracing::info!(config = ?self.config, "Pendulum sensor opened");
        Ok(())
    }

    fn sample(&mut self) -> Result<u16, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }

        for _ in 0..self.config.steps_per_sample {
            self.step();
        }

        let full_scale = ((1u32 << self.config.adc_bits) - 1) as f64;
        let wrapped = self.theta.rem_euclid(2.0 * PI) / (2.0 * PI);
        let counts = wrapped * full_scale + self.measurement_noise();

        Ok(counts.round().clamp(0.0, full_scale) as u16)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        tracing::info!("Pendulum sensor closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> PendulumSensor {
        PendulumSensor::new(PendulumConfig {
            seed: Some(7),
            ..Default::default()
        })
    }

    #[test]
    fn test_sensor_lifecycle() {
        let mut sensor = seeded();
        assert!(!sensor.is_open());

        sensor.open().unwrap();
        assert!(sensor.is_open());
        sensor.sample().unwrap();

        sensor.close();
        assert!(!sensor.is_open());
    }

    #[test]
    fn test_sample_without_open() {
        let mut sensor = seeded();
        assert!(matches!(sensor.sample(), Err(SourceError::NotOpen)));
    }

    #[test]
    fn test_samples_within_adc_range() {
        let mut sensor = PendulumSensor::new(PendulumConfig {
            adc_bits: 10,
            seed: Some(1),
            ..Default::default()
        });
        sensor.open().unwrap();

        for _ in 0..1000 {
            assert!(sensor.sample().unwrap() < 1024);
        }
    }

    #[test]
    fn test_readings_vary() {
        let mut sensor = seeded();
        sensor.open().unwrap();

        let readings: Vec<u16> = (0..200).map(|_| sensor.sample().unwrap()).collect();
        let first = readings[0];
        assert!(readings.iter().any(|&r| r != first));
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let mut sensor = PendulumSensor::new(PendulumConfig {
            adc_bits: 0,
            ..Default::default()
        });
        assert!(matches!(sensor.open(), Err(SourceError::Unavailable(_))));
        assert!(!sensor.is_open());
    }
}
