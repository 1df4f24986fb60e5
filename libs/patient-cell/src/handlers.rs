use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, State},
};
use serde_json::{json, Value};

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::state::AppState;
use uuid::Uuid;

use crate::models::{CreatePatientRequest, PatientError};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let patient = service.create_patient(request).await.map_err(map_error)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let patients = service.list_patients().await.map_err(map_error)?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let deleted = service.delete_patient(patient_id).await.map_err(map_error)?;

    Ok(Json(json!({ "deleted": deleted })))
}

fn map_error(error: PatientError) -> AppError {
    match error {
        PatientError::NotFound => AppError::NotFound(error.to_string()),
        PatientError::FiscalCodeAlreadyExists { .. } => AppError::BadRequest(error.to_string()),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}
