//! Notes Gateway Library
//!
//! HTTP gateway for a small multi-tenant note-keeping API. Every protected
//! request passes an authentication and admission-control pipeline before
//! any note logic runs:
//!
//! - HS256 bearer tokens issued at login and verified per request
//! - Principal lookup so tokens of deleted users stop working
//! - Per-identity token buckets with a discrete periodic refill
//!
//! # Architecture
//!
//! The gateway follows the Handler -> Service -> Repository pattern:
//!
//! ```text
//! routes/mod.rs -> middleware/pipeline.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token codec, principal resolver, password hashing
//! - `clock` - Injectable time source
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Admission pipeline and HTTP metrics
//! - `models` - Request and response bodies
//! - `observability` - Prometheus metrics
//! - `rate_limit` - Per-identity rate limiter registry
//! - `repositories` - Credential and note stores
//! - `routes` - Axum router setup
//! - `services` - Registration, login and note logic

pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod rate_limit;
pub mod repositories;
pub mod routes;
pub mod services;
