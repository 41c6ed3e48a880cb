//! Liveness endpoint.

/// Handler for GET /health
///
/// Returns "OK" while the process is serving. Checks no dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }
}
