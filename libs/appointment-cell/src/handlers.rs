use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, Query, State},
};
use serde_json::{json, Value};
use uuid::Uuid;

use patient_cell::models::CreatePatientRequest;
use patient_cell::services::PatientService;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{
    AgendaQuery, BookAppointmentRequest, BookingError, BookingOutcome, CancelAppointmentRequest,
    PublicBookingRequest,
};
use crate::services::{AgendaService, BookingService};

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<BookingOutcome>, AppError> {
    let service = BookingService::new(&state.db);

    let outcome = service.book_appointment(request).await.map_err(map_error)?;

    Ok(Json(outcome))
}

/// Booking without a credential: creates the patient record on the fly,
/// then runs the same booking path.
#[axum::debug_handler]
pub async fn public_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PublicBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let patients = PatientService::new(&state.db);

    let patient = patients
        .create_patient(CreatePatientRequest {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            birth_date: None,
            phone: request.phone.clone(),
            email: request.email.clone(),
            fiscal_code: None,
        })
        .await
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let service = BookingService::new(&state.db);
    let outcome = service
        .book_appointment(BookAppointmentRequest {
            patient_id: patient.id,
            doctor_id: request.doctor_id,
            visit_type_id: request.visit_type_id,
            room_id: request.room_id,
            start_at: request.start_at,
            note: request.note,
            allow_waitlist: request.allow_waitlist,
        })
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "ok": outcome.ok,
        "message": outcome.message,
        "appointment_id": outcome.appointment_id,
        "waitlisted": outcome.waitlisted,
        "patient_id": patient.id,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state.db);

    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_error)?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
    body: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state.db);

    let reason = body.as_ref().and_then(|b| b.reason.as_deref());
    let cancelled = service
        .cancel_appointment(appointment_id, reason)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "cancelled": cancelled })))
}

#[axum::debug_handler]
pub async fn day_agenda(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<AgendaQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(&state.db);

    let agenda = service
        .day_agenda(query.doctor_id, query.day)
        .await
        .map_err(map_error)?;

    Ok(Json(json!(agenda)))
}

fn map_error(error: BookingError) -> AppError {
    match error {
        BookingError::InvalidVisitType
        | BookingError::PatientNotFound
        | BookingError::DoctorNotFound
        | BookingError::RoomNotFound => AppError::BadRequest(error.to_string()),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}
