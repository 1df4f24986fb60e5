use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_type_id: i64,
    pub room_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WaitlistEntry {
    pub id: i64,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_type_id: i64,
    pub priority: i64,
    pub entered_at: DateTime<Utc>,
    pub note: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_type_id: i64,
    pub room_id: i64,
    pub start_at: DateTime<Utc>,
    pub note: Option<String>,
    #[serde(default = "default_allow_waitlist")]
    pub allow_waitlist: bool,
}

fn default_allow_waitlist() -> bool {
    true
}

/// Public booking: the patient record is created together with the booking
/// attempt, no credential required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicBookingRequest {
    pub doctor_id: Uuid,
    pub visit_type_id: i64,
    pub room_id: i64,
    pub start_at: DateTime<Utc>,
    pub note: Option<String>,
    #[serde(default = "default_allow_waitlist")]
    pub allow_waitlist: bool,

    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Slot-unavailable is a normal outcome carried here, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub ok: bool,
    pub appointment_id: Option<Uuid>,
    pub waitlisted: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgendaQuery {
    pub doctor_id: Uuid,
    pub day: NaiveDate,
}

/// One agenda line, flattened to display-friendly fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaEntry {
    pub start: String,
    pub end: String,
    pub status: AppointmentStatus,
    pub note: Option<String>,
    pub room: String,
    pub visit_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Unknown visit type")]
    InvalidVisitType,

    #[error("Unknown patient")]
    PatientNotFound,

    #[error("Unknown doctor")]
    DoctorNotFound,

    #[error("Unknown room")]
    RoomNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for BookingError {
    fn from(error: sqlx::Error) -> Self {
        BookingError::DatabaseError(error.to_string())
    }
}
