use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::jwt::{normalize_bearer_token, verify_token};
use crate::state::AppState;

/// Authentication middleware: verifies the bearer credential, resolves it
/// to an account, and rejects unless the account is active. The resolved
/// account is attached to the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = normalize_bearer_token(&auth_value[7..]);

    let claims = verify_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;

    let account_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Auth("Invalid token subject".to_string()))?;

    let account = sqlx::query_as::<_, AuthUser>(
        "SELECT id, username, active FROM user_accounts WHERE id = ?",
    )
    .bind(account_id)
    .fetch_optional(state.db.pool())
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;

    let user = match account {
        Some(user) if user.active => user,
        _ => return Err(AppError::Auth("Account is not valid".to_string())),
    };

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
