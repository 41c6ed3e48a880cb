//! Builder patterns for test token construction
//!
//! Tokens are signed with `jsonwebtoken`, independently of the gateway's
//! own codec, so tests can shape claims and secrets freely.

use crate::server_harness::{TEST_JWT_SECRET, TEST_JWT_TTL_SECONDS, TEST_START_EPOCH_SECONDS};
use common::jwt::TokenClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

/// Builder for signed HS256 test tokens.
///
/// Defaults match a token the test server would issue at the start of
/// its mock clock.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject(&user_id)
///     .issued_at(TEST_START_EPOCH_SECONDS)
///     .expires_in(60)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    sub: String,
    iat: i64,
    exp: i64,
    secret: String,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults.
    pub fn new() -> Self {
        Self {
            sub: "test-subject".to_string(),
            iat: TEST_START_EPOCH_SECONDS,
            exp: TEST_START_EPOCH_SECONDS + TEST_JWT_TTL_SECONDS,
            secret: TEST_JWT_SECRET.to_string(),
        }
    }

    /// Set the subject (user key).
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issued-at timestamp. Expiry keeps its current offset.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        let ttl = self.exp - self.iat;
        self.iat = timestamp;
        self.exp = timestamp + ttl;
        self
    }

    /// Set expiration in seconds after issued-at.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Set an absolute expiration timestamp.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Sign with a different secret.
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// The claims the token will carry.
    pub fn claims(&self) -> TokenClaims {
        TokenClaims {
            sub: self.sub.clone(),
            iat: self.iat,
            exp: self.exp,
            exp_ms: None,
        }
    }

    /// Build the signed token.
    pub fn build(self) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims(),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("HS256 encoding of test claims should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flip one character of the signature segment.
pub fn tamper_signature(token: &str) -> String {
    let (signing_input, signature) = token
        .rsplit_once('.')
        .expect("token should have a signature segment");
    let mut chars: Vec<char> = signature.chars().collect();
    let first = chars.first_mut().expect("signature should not be empty");
    *first = if *first == 'A' { 'B' } else { 'A' };
    format!("{}.{}", signing_input, chars.into_iter().collect::<String>())
}
