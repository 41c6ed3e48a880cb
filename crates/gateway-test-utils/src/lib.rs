//! # Gateway Test Utilities
//!
//! Shared test utilities for the notes gateway.
//!
//! This crate provides:
//! - Server test harness (`TestGatewayServer` for E2E tests)
//! - Token builders (`TestTokenBuilder` for hand-shaped and forged tokens)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestGatewayServer::spawn().await?;
//!     let token = server.register_and_login("alice", "pw").await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/me", server.url()))
//!         .bearer_auth(&token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use server_harness::*;
pub use token_builders::*;
