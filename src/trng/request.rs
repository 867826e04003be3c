//! Generation request validation.
//!
//! Requests are validated before the manager is consulted; a
//! [`GenerationRequest`] can only exist in a valid form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed or out-of-range request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing parameter '{0}'; enter a valid number")]
    Missing(&'static str),

    #[error("parameter '{name}' is not numeric: '{value}'; enter a valid number")]
    NotNumeric { name: &'static str, value: String },

    #[error("parameter '{0}' must be at least 1")]
    NotPositive(&'static str),

    #[error("parameter '{name}' is {value}, above the limit of {max}")]
    TooLarge {
        name: &'static str,
        value: u64,
        max: u64,
    },

    #[error("request asks for {requested} bits in total, above the limit of {max}")]
    TotalTooLarge { requested: u128, max: u64 },
}

/// Upper bounds on what a single request may ask for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    /// Maximum number of bit strings per request.
    pub max_quantity: u64,
    /// Maximum length of one bit string.
    pub max_bit_length: u64,
    /// Maximum of `quantity * bit_length`.
    pub max_total_bits: u64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_quantity: 10_000,
            max_bit_length: 1 << 16,
            max_total_bits: 1 << 24,
        }
    }
}

/// A validated request for `quantity` random strings of `bit_length` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    quantity: usize,
    bit_length: usize,
}

impl GenerationRequest {
    /// Validates numeric parameters against `limits`.
    pub fn new(quantity: i64, bit_length: i64, limits: &RequestLimits) -> Result<Self, ValidationError> {
        let quantity = Self::check("quantity", quantity, limits.max_quantity)?;
        let bit_length = Self::check("numBits", bit_length, limits.max_bit_length)?;

        let total = u128::from(quantity) * u128::from(bit_length);
        if total > u128::from(limits.max_total_bits) {
            return Err(ValidationError::TotalTooLarge {
                requested: total,
                max: limits.max_total_bits,
            });
        }

        Ok(Self {
            quantity: quantity as usize,
            bit_length: bit_length as usize,
        })
    }

    /// Validates raw query-string values.
    pub fn parse(
        quantity: Option<&str>,
        bit_length: Option<&str>,
        limits: &RequestLimits,
    ) -> Result<Self, ValidationError> {
        let quantity = Self::parse_number("quantity", quantity)?;
        let bit_length = Self::parse_number("numBits", bit_length)?;
        Self::new(quantity, bit_length, limits)
    }

    fn parse_number(name: &'static str, raw: Option<&str>) -> Result<i64, ValidationError> {
        let raw = raw.map(str::trim).ok_or(ValidationError::Missing(name))?;
        raw.parse().map_err(|_| ValidationError::NotNumeric {
            name,
            value: raw.to_string(),
        })
    }

    fn check(name: &'static str, value: i64, max: u64) -> Result<u64, ValidationError> {
        if value < 1 {
            return Err(ValidationError::NotPositive(name));
        }
        let value = value as u64;
        if value > max {
            return Err(ValidationError::TooLarge { name, value, max });
        }
        Ok(value)
    }

    /// Number of strings requested.
    #[inline]
    pub fn quantity(&self) -> usize {
        self.quantity
    }

    /// Bits per string.
    #[inline]
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Total raw bits the request consumes.
    #[inline]
    pub fn total_bits(&self) -> usize {
        self.quantity * self.bit_length
    }

    /// Hex characters per string.
    #[inline]
    pub fn hex_length(&self) -> usize {
        self.bit_length.div_ceil(4)
    }
}
