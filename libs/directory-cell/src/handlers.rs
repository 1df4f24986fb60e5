use std::sync::Arc;

use axum::extract::{Json, State};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::DirectoryError;
use crate::services::DirectoryService;

#[axum::debug_handler]
pub async fn list_doctors(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state.db);

    let doctors = service.list_active_doctors().await.map_err(map_error)?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state.db);

    let rooms = service.list_active_rooms().await.map_err(map_error)?;

    Ok(Json(json!(rooms)))
}

#[axum::debug_handler]
pub async fn list_visit_types(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state.db);

    let visit_types = service.list_visit_types().await.map_err(map_error)?;

    Ok(Json(json!(visit_types)))
}

fn map_error(error: DirectoryError) -> AppError {
    match error {
        DirectoryError::DoctorNotFound => AppError::NotFound(error.to_string()),
        DirectoryError::NameAlreadyExists { .. } => AppError::BadRequest(error.to_string()),
        DirectoryError::ValidationError(msg) => AppError::ValidationError(msg),
        DirectoryError::DatabaseError(msg) => AppError::Database(msg),
    }
}
