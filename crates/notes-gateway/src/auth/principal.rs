//! Resolves an `Authorization` header into an [`Identity`].

use crate::auth::identity::Identity;
use crate::auth::token::TokenCodec;
use crate::errors::AuthError;
use crate::repositories::CredentialStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

/// Required scheme prefix of the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Verifies bearer tokens and confirms the subject still exists.
///
/// Stateless apart from the shared codec and store handles.
#[derive(Clone)]
pub struct PrincipalResolver {
    codec: Arc<TokenCodec>,
    credentials: Arc<dyn CredentialStore>,
}

impl PrincipalResolver {
    pub fn new(codec: Arc<TokenCodec>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { codec, credentials }
    }

    /// Resolve the raw `Authorization` header value at `now`.
    ///
    /// # Errors
    ///
    /// - `MissingCredential` - header absent or not using the `Bearer ` scheme
    /// - `Malformed` / `InvalidSignature` / `Expired` - from token verification
    /// - `UnknownPrincipal` - subject not found, or the store lookup failed
    #[instrument(skip_all, name = "gateway.auth.principal.resolve")]
    pub async fn resolve(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let token = authorization
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| {
                tracing::debug!(target: "gateway.auth.principal", "Missing or non-bearer Authorization header");
                AuthError::MissingCredential
            })?;

        let subject = self.codec.verify(token, now)?;

        // Deleted principals keep valid tokens until expiry.
        match self.credentials.find_by_subject(&subject).await {
            Ok(Some(record)) => Ok(Identity::new(subject, Some(record.username))),
            Ok(None) => {
                tracing::debug!(target: "gateway.auth.principal", "Token subject not found");
                Err(AuthError::UnknownPrincipal)
            }
            Err(e) => {
                tracing::warn!(target: "gateway.auth.principal", error = %e, "Credential lookup failed");
                Err(AuthError::UnknownPrincipal)
            }
        }
    }
}
