//! Registration and login handlers.

use crate::errors::GatewayError;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, UserDto, UserResponse};
use crate::routes::AppState;
use crate::services::auth_service;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/auth/register
///
/// - 200 `{"user":{"username":"alice"}}`
/// - 400 blank username or password
/// - 409 username taken
#[instrument(skip_all, name = "gateway.handlers.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, GatewayError> {
    let user =
        auth_service::register(state.credentials.as_ref(), state.hasher.clone(), request).await?;

    Ok(Json(UserResponse {
        user: UserDto {
            username: user.username,
        },
    }))
}

/// Handler for POST /api/auth/login
///
/// - 200 `{"token":"<jwt>"}`
/// - 401 unknown user or wrong password
#[instrument(skip_all, name = "gateway.handlers.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, GatewayError> {
    let issued = auth_service::login(
        state.credentials.as_ref(),
        state.hasher.clone(),
        &state.codec,
        request,
        state.clock.now(),
    )
    .await?;

    Ok(Json(LoginResponse {
        token: issued.token,
    }))
}
