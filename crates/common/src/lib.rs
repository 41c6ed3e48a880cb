//! Common utilities and types shared across the notes gateway crates.

#![warn(clippy::pedantic)]

/// Module for strongly typed identifiers
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for bearer token claims and size limits
pub mod jwt;
