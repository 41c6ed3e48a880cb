//! Current identity handler.

use crate::auth::Identity;
use crate::models::MeResponse;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /api/me
///
/// Returns the identity attached by the admission pipeline:
///
/// ```json
/// { "subject": "5f0e6a52-...", "displayName": "alice" }
/// ```
#[instrument(skip_all, name = "gateway.handlers.me")]
pub async fn get_me(Extension(identity): Extension<Identity>) -> Json<MeResponse> {
    Json(MeResponse {
        subject: identity.subject().to_string(),
        display_name: identity.display_name().map(str::to_owned),
    })
}
