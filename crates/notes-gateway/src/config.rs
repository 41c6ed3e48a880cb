//! Notes gateway configuration.
//!
//! Configuration is loaded from environment variables. The signing secret
//! and token TTL have no defaults; a missing value is a startup failure.
//! The signing secret is redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default bucket capacity. Zero blocks every identified request unless
/// rate limiting is disabled.
pub const DEFAULT_RATE_LIMIT_CAPACITY: u64 = 0;

/// Default refill period in seconds (one minute).
pub const DEFAULT_RATE_LIMIT_REFILL_SECONDS: u64 = 60;

/// Minimum signing secret length in bytes (256 bits for HS256).
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum accepted bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum accepted bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Notes gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// HMAC signing secret for bearer tokens.
    pub jwt_secret: SecretString,

    /// Lifetime of issued tokens.
    pub jwt_ttl: Duration,

    /// Permits per identity per refill period.
    pub rate_limit_capacity: u64,

    /// Period after which an identity's bucket is reset to full capacity.
    pub rate_limit_refill_period: Duration,

    /// Initial state of the rate limiting kill switch.
    pub rate_limit_enabled: bool,

    /// Bcrypt cost factor for password hashing.
    pub bcrypt_cost: u32,
}

/// Custom Debug implementation that redacts the signing secret.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("rate_limit_capacity", &self.rate_limit_capacity)
            .field("rate_limit_refill_period", &self.rate_limit_refill_period)
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret configuration: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid JWT TTL configuration: {0}")]
    InvalidJwtTtl(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid bcrypt cost configuration: {0}")]
    InvalidBcryptCost(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_secret = SecretString::from(
            vars.get("JWT_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?
                .clone(),
        );

        if jwt_secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "JWT_SECRET must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }

        let ttl_str = vars
            .get("JWT_TTL_SECONDS")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_TTL_SECONDS".to_string()))?;
        let ttl_seconds: u64 = ttl_str.parse().map_err(|e| {
            ConfigError::InvalidJwtTtl(format!(
                "JWT_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                ttl_str, e
            ))
        })?;
        if ttl_seconds == 0 {
            return Err(ConfigError::InvalidJwtTtl(
                "JWT_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let rate_limit_capacity = if let Some(value_str) = vars.get("RATE_LIMIT_CAPACITY") {
            value_str.parse::<u64>().map_err(|e| {
                ConfigError::InvalidRateLimit(format!(
                    "RATE_LIMIT_CAPACITY must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_RATE_LIMIT_CAPACITY
        };

        let refill_seconds = if let Some(value_str) = vars.get("RATE_LIMIT_REFILL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRateLimit(format!(
                    "RATE_LIMIT_REFILL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "RATE_LIMIT_REFILL_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_RATE_LIMIT_REFILL_SECONDS
        };

        let rate_limit_enabled = if let Some(value_str) = vars.get("RATE_LIMIT_ENABLED") {
            value_str.parse::<bool>().map_err(|_| {
                ConfigError::InvalidRateLimit(format!(
                    "RATE_LIMIT_ENABLED must be 'true' or 'false', got '{}'",
                    value_str
                ))
            })?
        } else {
            true
        };

        let bcrypt_cost = if let Some(value_str) = vars.get("BCRYPT_COST") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&value) {
                return Err(ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, value
                )));
            }

            value
        } else {
            DEFAULT_BCRYPT_COST
        };

        Ok(Config {
            bind_address,
            jwt_secret,
            jwt_ttl: Duration::from_secs(ttl_seconds),
            rate_limit_capacity,
            rate_limit_refill_period: Duration::from_secs(refill_seconds),
            rate_limit_enabled,
            bcrypt_cost,
        })
    }
}
