//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs (`header.payload.signature`) signed with the
//! single process-wide secret. Validity is purely a function of the
//! signature and the expiry; there is no server-side revocation.
//!
//! Expiry is compared at millisecond precision through the `exp_ms` claim,
//! so a token issued at `t` stays valid for every `t'` in `[t, t + ttl)`.
//! The registered `exp` claim is rounded up to the next whole second for
//! other JWT verifiers.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE decoding (`MAX_TOKEN_SIZE_BYTES`)
//! - Only `HS256` is accepted
//! - `sub` and `exp` are required claims

use crate::config::{Config, ConfigError, MIN_JWT_SECRET_BYTES};
use crate::errors::{AuthError, GatewayError};
use chrono::{DateTime, Utc};
use common::jwt::{TokenClaims, MAX_TOKEN_SIZE_BYTES};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// A freshly issued token and the claims it carries.
#[derive(Clone)]
pub struct IssuedToken {
    /// Compact serialization handed to the client.
    pub token: String,

    /// Claims embedded in the token.
    pub claims: TokenClaims,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Signs and verifies identity tokens.
///
/// Stateless beyond read-only configuration; share behind an `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec from a signing secret and token lifetime.
    ///
    /// # Errors
    ///
    /// - `InvalidJwtSecret` - secret shorter than `MIN_JWT_SECRET_BYTES`
    /// - `InvalidJwtTtl` - zero or unrepresentable lifetime
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, ConfigError> {
        let secret_bytes = secret.expose_secret().as_bytes();
        if secret_bytes.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "signing secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }

        if ttl.is_zero() {
            return Err(ConfigError::InvalidJwtTtl(
                "token lifetime must be greater than 0".to_string(),
            ));
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ConfigError::InvalidJwtTtl(format!("token lifetime out of range: {}", e)))?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
            ttl,
        })
    }

    /// Create a codec from the loaded service configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(&config.jwt_secret, config.jwt_ttl)
    }

    /// Configured token lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a token for `subject` valid from `now` until `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if signing fails.
    #[instrument(skip_all, name = "gateway.auth.token.issue")]
    pub fn issue(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, GatewayError> {
        let exp_ms = now
            .timestamp_millis()
            .saturating_add(self.ttl.num_milliseconds());
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: exp_ms.saturating_add(999).div_euclid(1000),
            exp_ms: Some(exp_ms),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("Token signing failed: {}", e)))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify `token` at `now` and return its subject.
    ///
    /// # Errors
    ///
    /// - `Malformed` - oversized, not a JWT, undecodable, missing claims, or not HS256
    /// - `InvalidSignature` - signature does not match the configured secret
    /// - `Expired` - `now` is at or past the token's expiry
    #[instrument(skip_all, name = "gateway.auth.token.verify")]
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "gateway.auth.token",
                token_size = token.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthError::Malformed);
        }

        let token_data =
            decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!(target: "gateway.auth.token", error = %e, "Token verification failed");
                match e.kind() {
                    ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                    _ => AuthError::Malformed,
                }
            })?;
        let claims = token_data.claims;

        if now.timestamp_millis() >= claims.expires_at_millis() {
            tracing::debug!(
                target: "gateway.auth.token",
                exp_ms = claims.expires_at_millis(),
                now_ms = now.timestamp_millis(),
                "Token expired"
            );
            return Err(AuthError::Expired);
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-bytes";
    const OTHER_SECRET: &str = "another-secret-key-at-least-32-bytes!!";
    const TTL: i64 = 3600;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            &SecretString::from(SECRET),
            Duration::from_secs(TTL as u64),
        )
        .unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn sign(claims: &TokenClaims, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_sets_iat_and_exp() {
        let issued = codec().issue("user-1", at(1_000)).unwrap();
        assert_eq!(issued.claims.sub, "user-1");
        assert_eq!(issued.claims.iat, 1_000);
        assert_eq!(issued.claims.exp, 1_000 + TTL);
        assert_eq!(issued.claims.exp_ms, Some((1_000 + TTL) * 1000));
        assert_eq!(issued.token.split('.').count(), 3);
    }

    #[test]
    fn test_issue_rounds_registered_exp_up() {
        let issued = codec().issue("user-1", at_millis(1_000_900)).unwrap();
        assert_eq!(issued.claims.iat, 1_000);
        assert_eq!(issued.claims.exp_ms, Some(1_000_900 + TTL * 1000));
        assert_eq!(issued.claims.exp, 1_001 + TTL);
    }

    #[test]
    fn test_issue_is_deterministic() {
        let codec = codec();
        assert_eq!(
            codec.issue("user-1", at(1_000)).unwrap().token,
            codec.issue("user-1", at(1_000)).unwrap().token
        );
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let codec = codec();
        let token = codec.issue("user-1", at(1_000)).unwrap().token;

        for t in [1_000, 1_001, 1_000 + TTL / 2, 1_000 + TTL - 1] {
            assert_eq!(codec.verify(&token, at(t)), Ok("user-1".to_string()));
        }
    }

    #[test]
    fn test_round_trip_with_sub_second_issue_time() {
        let codec = codec();
        let issued_ms = 1_000_900;
        let token = codec.issue("u1", at_millis(issued_ms)).unwrap().token;
        let ttl_ms = TTL * 1000;

        for t in [issued_ms, issued_ms + ttl_ms - 400, issued_ms + ttl_ms - 1] {
            assert_eq!(codec.verify(&token, at_millis(t)), Ok("u1".to_string()), "t={t}");
        }
        assert_eq!(
            codec.verify(&token, at_millis(issued_ms + ttl_ms)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_expired_at_exactly_ttl() {
        let codec = codec();
        let token = codec.issue("user-1", at(1_000)).unwrap().token;

        assert_eq!(codec.verify(&token, at(1_000 + TTL)), Err(AuthError::Expired));
        assert_eq!(codec.verify(&token, at(1_000 + TTL + 1)), Err(AuthError::Expired));
    }

    #[test]
    fn test_flipping_any_signature_byte_is_invalid_signature() {
        let codec = codec();
        let token = codec.issue("user-1", at(1_000)).unwrap().token;
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(
                codec.verify(&tampered, at(1_001)),
                Err(AuthError::InvalidSignature),
                "tampering signature byte {i} must be detected"
            );
        }
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let codec = codec();
        let token = codec.issue("user-1", at(1_000)).unwrap().token;
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = TokenClaims {
            sub: "user-2".to_string(),
            iat: 1_000,
            exp: 1_000 + TTL,
            exp_ms: None,
        };
        let other = sign(&forged_claims, Algorithm::HS256, OTHER_SECRET);
        let forged_payload = other.split('.').nth(1).unwrap();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(codec.verify(&forged, at(1_001)), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_other_secret_is_invalid_signature() {
        let token = codec().issue("user-1", at(1_000)).unwrap().token;
        let other =
            TokenCodec::new(&SecretString::from(OTHER_SECRET), Duration::from_secs(60)).unwrap();

        assert_eq!(other.verify(&token, at(1_001)), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_with_bad_signature_reports_signature() {
        let codec = codec();
        let token = codec.issue("user-1", at(1_000)).unwrap().token;
        let tampered = format!("{}x", &token[..token.len() - 1]);

        assert_eq!(
            codec.verify(&tampered, at(1_000 + TTL + 10)),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.sig", "e30.e30.sig"] {
            assert_eq!(
                codec.verify(token, at(1_000)),
                Err(AuthError::Malformed),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_oversized_token_is_malformed() {
        let token = format!("{}.b.c", "a".repeat(MAX_TOKEN_SIZE_BYTES));
        assert_eq!(codec().verify(&token, at(1_000)), Err(AuthError::Malformed));
    }

    #[test]
    fn test_wrong_algorithm_is_malformed() {
        let claims = TokenClaims {
            sub: "user-1".to_string(),
            iat: 1_000,
            exp: 9_999,
            exp_ms: None,
        };
        let token = sign(&claims, Algorithm::HS384, SECRET);

        assert_eq!(codec().verify(&token, at(1_000)), Err(AuthError::Malformed));
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({"sub": "user-1", "iat": 1_000}),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec().verify(&token, at(1_000)), Err(AuthError::Malformed));
    }

    #[test]
    fn test_new_rejects_short_secret() {
        let result = TokenCodec::new(&SecretString::from("too-short"), Duration::from_secs(60));
        assert!(matches!(result, Err(ConfigError::InvalidJwtSecret(_))));
    }

    #[test]
    fn test_new_rejects_zero_ttl() {
        let result = TokenCodec::new(&SecretString::from(SECRET), Duration::ZERO);
        assert!(matches!(result, Err(ConfigError::InvalidJwtTtl(_))));
    }

    #[test]
    fn test_issued_token_verifies_with_registered_claims_only() {
        let now = chrono::Utc::now();
        let token = codec().issue("user-1", now).unwrap().token;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .expect("standard HS256 validation should accept gateway tokens");

        assert_eq!(data.claims["sub"], "user-1");
        assert_eq!(data.claims["iat"], now.timestamp());
    }

    #[test]
    fn test_token_without_exp_ms_uses_exp() {
        let claims = TokenClaims {
            sub: "user-9".to_string(),
            iat: 1_000,
            exp: 2_000,
            exp_ms: None,
        };
        let token = sign(&claims, Algorithm::HS256, SECRET);
        let codec = codec();

        assert_eq!(codec.verify(&token, at(1_500)), Ok("user-9".to_string()));
        assert_eq!(codec.verify(&token, at_millis(1_999_999)), Ok("user-9".to_string()));
        assert_eq!(codec.verify(&token, at(2_000)), Err(AuthError::Expired));
    }

    #[test]
    fn test_debug_redacts_token_and_secret() {
        let codec = codec();
        let issued = codec.issue("user-1", at(1_000)).unwrap();

        assert!(!format!("{:?}", codec).contains(SECRET));
        assert!(!format!("{:?}", issued).contains(&issued.token));
    }
}
