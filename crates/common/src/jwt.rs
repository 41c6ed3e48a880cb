//! Bearer token claims shared by the issuer, the verifier and tests.
//!
//! Tokens are HS256 JWTs. The payload carries `sub`, `iat` and `exp` as
//! whole epoch seconds, plus `exp_ms`, the exact expiry in epoch
//! milliseconds. Verifiers compare against `exp_ms` when present and fall
//! back to `exp` for tokens that only carry the registered claim.
//!
//! # Security
//!
//! - Tokens larger than [`MAX_TOKEN_SIZE_BYTES`] are rejected before decoding
//! - The `sub` field in [`TokenClaims`] is redacted in Debug output

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted token size in bytes (8KB).
///
/// A typical token here is well under 300 bytes. Anything larger is
/// rejected before base64 decoding or MAC computation.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Token payload.
///
/// `sub` is the principal's user key. It is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user key) - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds, rounded up).
    pub exp: i64,

    /// Exact expiration (Unix epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_ms: Option<i64>,
}

impl TokenClaims {
    /// Expiry in epoch milliseconds, from `exp_ms` or else `exp`.
    #[must_use]
    pub fn expires_at_millis(&self) -> i64 {
        self.exp_ms
            .unwrap_or_else(|| self.exp.saturating_mul(1000))
    }
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("exp_ms", &self.exp_ms)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_max_token_size_is_8kb() {
        assert_eq!(MAX_TOKEN_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_claims_without_exp_ms_deserialize() {
        let claims: TokenClaims =
            serde_json::from_str(r#"{"sub":"u1","iat":10,"exp":70}"#).unwrap();
        assert_eq!(claims.exp_ms, None);
        assert_eq!(claims.expires_at_millis(), 70_000);
    }

    #[test]
    fn test_exp_ms_takes_precedence() {
        let claims = TokenClaims {
            sub: "u1".to_string(),
            iat: 10,
            exp: 71,
            exp_ms: Some(70_400),
        };
        assert_eq!(claims.expires_at_millis(), 70_400);

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains(r#""exp_ms":70400"#));
    }

    #[test]
    fn test_missing_exp_is_rejected() {
        let result = serde_json::from_str::<TokenClaims>(r#"{"sub":"u1","iat":10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims = TokenClaims {
            sub: "secret-user-id".to_string(),
            iat: 1,
            exp: 2,
            exp_ms: None,
        };
        let debug_str = format!("{claims:?}");
        assert!(!debug_str.contains("secret-user-id"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
