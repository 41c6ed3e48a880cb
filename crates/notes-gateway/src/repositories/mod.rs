//! Repository layer for the notes gateway.
//!
//! Stores are narrow async traits so the gateway core only depends on
//! `find_by_subject`; the in-memory implementations back the binary and
//! the test harness.

pub mod notes;
pub mod users;

pub use notes::{InMemoryNoteStore, Note, NoteStore, LATEST_NOTES_LIMIT};
pub use users::{CredentialStore, InMemoryCredentialStore, UserRecord};

use crate::errors::GatewayError;
use thiserror::Error;

/// Collaborator failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => GatewayError::Conflict(what),
            StoreError::Unavailable(reason) => GatewayError::Internal(reason),
        }
    }
}
