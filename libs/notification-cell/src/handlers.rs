use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{NotificationError, PendingQuery};
use crate::services::NotificationService;

const DEFAULT_PENDING_LIMIT: i64 = 50;

#[axum::debug_handler]
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state.db);

    let notifications = service
        .list_pending(query.limit.unwrap_or(DEFAULT_PENDING_LIMIT))
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len()
    })))
}

#[axum::debug_handler]
pub async fn mark_sent(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(notification_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state.db);

    let sent = service.mark_sent(notification_id).await.map_err(map_error)?;

    Ok(Json(json!({ "sent": sent })))
}

fn map_error(error: NotificationError) -> AppError {
    match error {
        NotificationError::DatabaseError(msg) => AppError::Database(msg),
    }
}
