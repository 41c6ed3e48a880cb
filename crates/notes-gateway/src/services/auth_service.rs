//! Registration and login.
//!
//! These flows sit outside the admission pipeline: they are public and
//! produce the tokens the pipeline later verifies.

use crate::auth::{IssuedToken, PasswordHasher, TokenCodec};
use crate::errors::GatewayError;
use crate::models::{LoginRequest, RegisterRequest};
use crate::observability::metrics;
use crate::repositories::{CredentialStore, UserRecord};
use chrono::{DateTime, Utc};
use common::types::UserId;
use std::sync::Arc;
use tracing::instrument;

/// Register a new principal.
///
/// # Errors
///
/// - `BadRequest` - blank username or password
/// - `Conflict` - username already taken
#[instrument(skip_all, name = "gateway.services.auth.register")]
pub async fn register(
    credentials: &dyn CredentialStore,
    hasher: Arc<dyn PasswordHasher>,
    request: RegisterRequest,
) -> Result<UserRecord, GatewayError> {
    if request.username.trim().is_empty() {
        return Err(GatewayError::BadRequest("Username must not be blank".to_string()));
    }
    if request.password.trim().is_empty() {
        return Err(GatewayError::BadRequest("Password must not be blank".to_string()));
    }

    if credentials.find_by_username(&request.username).await?.is_some() {
        return Err(GatewayError::Conflict("User already exists".to_string()));
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| GatewayError::Internal(format!("Password hashing task failed: {}", e)))??;

    let record = UserRecord {
        id: UserId::new(),
        username: request.username,
        password_hash,
    };

    // The store re-checks uniqueness under its write lock.
    credentials.insert(record.clone()).await?;

    tracing::info!(target: "gateway.services.auth", user_id = %record.id, "User registered");
    Ok(record)
}

/// Check a username/password pair.
///
/// Unknown users and wrong passwords fail identically.
///
/// # Errors
///
/// - `InvalidCredentials` - unknown user or wrong password
#[instrument(skip_all, name = "gateway.services.auth.verify_password")]
pub async fn verify_password(
    credentials: &dyn CredentialStore,
    hasher: Arc<dyn PasswordHasher>,
    username: &str,
    password: String,
) -> Result<UserRecord, GatewayError> {
    let Some(user) = credentials.find_by_username(username).await? else {
        tracing::debug!(target: "gateway.services.auth", "Login for unknown username");
        return Err(GatewayError::InvalidCredentials);
    };

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| GatewayError::Internal(format!("Password verification task failed: {}", e)))??;

    if !matches {
        tracing::debug!(target: "gateway.services.auth", "Login with wrong password");
        return Err(GatewayError::InvalidCredentials);
    }

    Ok(user)
}

/// Verify credentials and issue a token whose subject is the user id.
#[instrument(skip_all, name = "gateway.services.auth.login")]
pub async fn login(
    credentials: &dyn CredentialStore,
    hasher: Arc<dyn PasswordHasher>,
    codec: &TokenCodec,
    request: LoginRequest,
    now: DateTime<Utc>,
) -> Result<IssuedToken, GatewayError> {
    let user = verify_password(credentials, hasher, &request.username, request.password).await?;

    let issued = codec.issue(&user.id.to_string(), now)?;
    metrics::record_token_issued();
    tracing::info!(target: "gateway.services.auth", user_id = %user.id, "Token issued");

    Ok(issued)
}
