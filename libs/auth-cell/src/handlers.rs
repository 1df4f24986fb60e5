use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
};
use tracing::debug;

use shared_models::auth::{AuthUser, MeResponse, TokenResponse};
use shared_models::error::AppError;
use shared_utils::jwt::issue_token;
use shared_utils::state::AppState;

use crate::models::{AuthError, LoginRequest, RegisterRequest, RegisterResponse};
use crate::services::AccountService;

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let service = AccountService::new(&state.db);

    let user_id = service
        .register(&request.username, &request.password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidInput | AuthError::DuplicateUsername => {
                AppError::BadRequest(e.to_string())
            }
            AuthError::DatabaseError(msg) => AppError::Database(msg),
            AuthError::HashingError(msg) => AppError::Internal(msg),
        })?;

    Ok(Json(RegisterResponse { ok: true, user_id }))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let service = AccountService::new(&state.db);

    let account = service
        .authenticate(&request.username, &request.password)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    let token = issue_token(
        &account.id.to_string(),
        &account.username,
        &state.config.jwt_secret,
        state.config.jwt_expire_minutes,
    )
    .map_err(AppError::Internal)?;

    debug!("Issued credential for account {}", account.id);
    Ok(Json(TokenResponse::bearer(token)))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>, AppError> {
    let service = AccountService::new(&state.db);

    let account = service
        .get_account(user.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::Auth("Account is not valid".to_string()))?;

    Ok(Json(MeResponse {
        id: account.id,
        username: account.username,
        active: account.active,
        created_at: Some(account.created_at),
    }))
}
