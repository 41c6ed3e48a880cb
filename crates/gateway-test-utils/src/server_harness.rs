//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use notes_gateway::clock::MockClock;
use notes_gateway::config::Config;
use notes_gateway::observability::metrics::init_metrics_recorder;
use notes_gateway::rate_limit::RateLimiterRegistry;
use notes_gateway::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "test-secret-key-that-is-at-least-32-bytes";

/// Token lifetime used by test servers unless overridden.
pub const TEST_JWT_TTL_SECONDS: i64 = 3600;

/// Start of the mock clock (2023-11-14T22:13:20Z).
pub const TEST_START_EPOCH_SECONDS: i64 = 1_700_000_000;

/// Process-wide metrics handle shared by every test server.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            // If a recorder is already installed, fall back to a standalone one.
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the notes gateway in E2E tests.
///
/// Time is driven by a [`MockClock`] shared with the server, so token
/// expiry and rate-limit refill can be crossed without sleeping.
///
/// # Example
/// ```rust,ignore
/// let server = TestGatewayServer::spawn_with(&[("RATE_LIMIT_CAPACITY", "1")]).await?;
/// server.clock().advance_secs(61);
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    state: Arc<AppState>,
    clock: MockClock,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(&[]).await
    }

    /// Spawn a server with configuration overrides.
    ///
    /// Defaults: capacity 100 per 60s, rate limiting enabled, bcrypt cost 10,
    /// TTL [`TEST_JWT_TTL_SECONDS`].
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let ttl = TEST_JWT_TTL_SECONDS.to_string();
        let mut vars: HashMap<String, String> = [
            ("BIND_ADDRESS", "127.0.0.1:0"),
            ("JWT_SECRET", TEST_JWT_SECRET),
            ("JWT_TTL_SECONDS", ttl.as_str()),
            ("RATE_LIMIT_CAPACITY", "100"),
            ("RATE_LIMIT_REFILL_SECONDS", "60"),
            ("BCRYPT_COST", "10"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let clock = MockClock::at_epoch_seconds(TEST_START_EPOCH_SECONDS);
        let state = Arc::new(
            AppState::from_config(&config, Arc::new(clock.clone()))
                .map_err(|e| anyhow::anyhow!("Failed to create app state: {}", e))?,
        );

        // Build routes using the gateway's real route builder
        let app = routes::build_routes(state.clone(), test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            state,
            clock,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The clock the server reads time from.
    pub fn clock(&self) -> &MockClock {
        &self.clock
    }

    /// The server's rate limiter registry.
    pub fn rate_limiter(&self) -> &RateLimiterRegistry {
        &self.state.rate_limiter
    }

    /// The server's application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// A shared HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST /api/auth/register.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/api/auth/register", self.url()))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?)
    }

    /// POST /api/auth/login.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/api/auth/login", self.url()))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?)
    }

    /// Register a user, log in, and return the bearer token.
    pub async fn register_and_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, anyhow::Error> {
        let registered = self.register(username, password).await?;
        anyhow::ensure!(
            registered.status().is_success(),
            "register failed: {}",
            registered.status()
        );

        let logged_in = self.login(username, password).await?;
        anyhow::ensure!(
            logged_in.status().is_success(),
            "login failed: {}",
            logged_in.status()
        );

        let body: serde_json::Value = logged_in.json().await?;
        body["token"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("login response has no token"))
    }

    /// GET `path` with an optional raw `Authorization` header value.
    pub async fn get_with_auth(
        &self,
        path: &str,
        authorization: Option<&str>,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let mut request = self.client.get(format!("{}{}", self.url(), path));
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        Ok(request.send().await?)
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
