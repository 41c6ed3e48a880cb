//! Business logic for the notes gateway.
//!
//! - [`auth_service`] registration, password checks and login
//! - [`note_service`] note CRUD for an admitted identity

pub mod auth_service;
pub mod note_service;
