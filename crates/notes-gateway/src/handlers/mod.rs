//! HTTP request handlers for the notes gateway.

pub mod auth;
pub mod health;
pub mod me;
pub mod metrics;
pub mod notes;

pub use auth::{login, register};
pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
pub use notes::{create_note, delete_note, latest_notes, update_note};
