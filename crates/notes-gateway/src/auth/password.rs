//! Password hashing.
//!
//! The algorithm is pluggable through [`PasswordHasher`]; the gateway
//! ships a bcrypt implementation. Both operations are CPU bound and are
//! expected to be called from `spawn_blocking`.

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::GatewayError;
use tracing::instrument;

/// Hash and verify login passwords.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    fn hash(&self, password: &str) -> Result<String, GatewayError>;

    /// Check a plaintext password against a stored hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, GatewayError>;
}

/// bcrypt with a configurable cost factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    #[instrument(skip_all, name = "gateway.auth.password.hash")]
    fn hash(&self, password: &str) -> Result<String, GatewayError> {
        // Config validates the range too; this guards direct construction.
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.cost) {
            return Err(GatewayError::Internal(format!(
                "Invalid bcrypt cost: {} (must be {}-{})",
                self.cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        bcrypt::hash(password, self.cost)
            .map_err(|e| GatewayError::Internal(format!("Password hashing failed: {}", e)))
    }

    #[instrument(skip_all, name = "gateway.auth.password.verify")]
    fn verify(&self, password: &str, hash: &str) -> Result<bool, GatewayError> {
        bcrypt::verify(password, hash)
            .map_err(|e| GatewayError::Internal(format!("Password verification failed: {}", e)))
    }
}
