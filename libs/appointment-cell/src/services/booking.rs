use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::NotificationKind;
use notification_cell::services::insert_pending;
use shared_database::Database;

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingError, BookingOutcome,
};
use crate::services::conflict::slot_is_free;
use crate::services::waitlist::promote_from_waitlist;

pub(crate) const DEFAULT_WAITLIST_PRIORITY: i64 = 5;

pub struct BookingService {
    db: Database,
}

impl BookingService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Book an appointment, or fall back to the waitlist when the slot is
    /// taken. The availability check, the insert and the notification all
    /// run in one transaction against the same snapshot.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<BookingOutcome, BookingError> {
        info!(
            "Booking appointment for patient {} with doctor {} at {}",
            request.patient_id, request.doctor_id, request.start_at
        );

        let mut tx = self.db.begin().await?;

        let visit_type = fetch_visit_type(&mut tx, request.visit_type_id)
            .await?
            .ok_or(BookingError::InvalidVisitType)?;

        ensure_patient_exists(&mut tx, request.patient_id).await?;
        ensure_doctor_exists(&mut tx, request.doctor_id).await?;
        ensure_room_exists(&mut tx, request.room_id).await?;

        let end_at = request.start_at + ChronoDuration::minutes(visit_type.duration_minutes);

        if slot_is_free(
            &mut tx,
            request.doctor_id,
            request.room_id,
            request.start_at,
            end_at,
        )
        .await?
        {
            let insert = insert_appointment(
                &mut tx,
                request.patient_id,
                request.doctor_id,
                request.visit_type_id,
                request.room_id,
                request.start_at,
                end_at,
                AppointmentStatus::Confirmed,
                request.note.as_deref(),
            )
            .await;

            match insert {
                Ok(appointment_id) => {
                    let message = format!(
                        "Appointment confirmed for {}.",
                        request.start_at.format("%Y-%m-%d %H:%M")
                    );
                    insert_pending(
                        &mut tx,
                        NotificationKind::Confirmation,
                        &message,
                        Some(appointment_id),
                        Some(request.patient_id),
                    )
                    .await?;

                    tx.commit().await?;
                    info!("Appointment {} confirmed", appointment_id);

                    return Ok(BookingOutcome {
                        ok: true,
                        appointment_id: Some(appointment_id),
                        waitlisted: false,
                        message: "Appointment confirmed.".to_string(),
                    });
                }
                // A concurrent booking won the identical start instant
                // between our check and our insert. Same outcome as a
                // pre-checked conflict, never a storage error.
                Err(e) if is_unique_violation(&e) => {
                    warn!(
                        "Start-instant collision for doctor {} at {}",
                        request.doctor_id, request.start_at
                    );
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            warn!(
                "Slot conflict for doctor {} / room {} at {}",
                request.doctor_id, request.room_id, request.start_at
            );
        }

        let outcome = enqueue_or_reject(&mut tx, &request).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Cancel an appointment and promote from the waitlist into the freed
    /// slot, all in one transaction. Returns false (no side effects) when
    /// the appointment is missing or already cancelled.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        reason: Option<&str>,
    ) -> Result<bool, BookingError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let mut tx = self.db.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(
            "SELECT id, patient_id, doctor_id, visit_type_id, room_id, start_at, end_at, status, note
             FROM appointments WHERE id = ?",
        )
        .bind(appointment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let appointment = match appointment {
            Some(a) if a.status != AppointmentStatus::Cancelled => a,
            _ => {
                debug!("Nothing to cancel for appointment {}", appointment_id);
                return Ok(false);
            }
        };

        sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
            .bind(AppointmentStatus::Cancelled)
            .bind(appointment_id)
            .execute(&mut *tx)
            .await?;

        let message = format!("Appointment cancelled. Reason: {}", reason.unwrap_or("n/a"));
        insert_pending(
            &mut tx,
            NotificationKind::Cancellation,
            &message,
            Some(appointment_id),
            Some(appointment.patient_id),
        )
        .await?;

        promote_from_waitlist(
            &mut tx,
            appointment.doctor_id,
            appointment.visit_type_id,
            appointment.start_at,
            appointment.room_id,
        )
        .await?;

        tx.commit().await?;
        info!("Appointment {} cancelled", appointment_id);
        Ok(true)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, BookingError> {
        sqlx::query_as::<_, Appointment>(
            "SELECT id, patient_id, doctor_id, visit_type_id, room_id, start_at, end_at, status, note
             FROM appointments WHERE id = ?",
        )
        .bind(appointment_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(BookingError::from)
    }
}

/// Slot taken: either record the request on the waitlist or report the
/// conflict as a plain unavailable outcome.
async fn enqueue_or_reject(
    conn: &mut SqliteConnection,
    request: &BookAppointmentRequest,
) -> Result<BookingOutcome, BookingError> {
    if !request.allow_waitlist {
        return Ok(BookingOutcome {
            ok: false,
            appointment_id: None,
            waitlisted: false,
            message: "Slot not available (doctor or room already booked).".to_string(),
        });
    }

    let note = format!(
        "Requested for {} (slot unavailable).",
        request.start_at.to_rfc3339()
    );

    sqlx::query(
        "INSERT INTO waitlist_entries (patient_id, doctor_id, visit_type_id, priority, entered_at, note)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(request.patient_id)
    .bind(request.doctor_id)
    .bind(request.visit_type_id)
    .bind(DEFAULT_WAITLIST_PRIORITY)
    .bind(Utc::now())
    .bind(&note)
    .execute(&mut *conn)
    .await?;

    insert_pending(
        conn,
        NotificationKind::Reminder,
        "You have been added to the waitlist: we will let you know when a slot frees up.",
        None,
        Some(request.patient_id),
    )
    .await?;

    info!(
        "Patient {} waitlisted for doctor {} ({})",
        request.patient_id, request.doctor_id, request.start_at
    );

    Ok(BookingOutcome {
        ok: true,
        appointment_id: None,
        waitlisted: true,
        message: "Slot full: patient added to the waitlist.".to_string(),
    })
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VisitTypeRow {
    pub duration_minutes: i64,
}

pub(crate) async fn fetch_visit_type(
    conn: &mut SqliteConnection,
    visit_type_id: i64,
) -> Result<Option<VisitTypeRow>, sqlx::Error> {
    sqlx::query_as::<_, VisitTypeRow>(
        "SELECT duration_minutes FROM visit_types WHERE id = ?",
    )
    .bind(visit_type_id)
    .fetch_optional(&mut *conn)
    .await
}

async fn ensure_patient_exists(
    conn: &mut SqliteConnection,
    patient_id: Uuid,
) -> Result<(), BookingError> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM patients WHERE id = ?")
        .bind(patient_id)
        .fetch_optional(&mut *conn)
        .await?;
    found.map(|_| ()).ok_or(BookingError::PatientNotFound)
}

async fn ensure_doctor_exists(
    conn: &mut SqliteConnection,
    doctor_id: Uuid,
) -> Result<(), BookingError> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM doctors WHERE id = ?")
        .bind(doctor_id)
        .fetch_optional(&mut *conn)
        .await?;
    found.map(|_| ()).ok_or(BookingError::DoctorNotFound)
}

async fn ensure_room_exists(conn: &mut SqliteConnection, room_id: i64) -> Result<(), BookingError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM rooms WHERE id = ?")
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?;
    found.map(|_| ()).ok_or(BookingError::RoomNotFound)
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_appointment(
    conn: &mut SqliteConnection,
    patient_id: Uuid,
    doctor_id: Uuid,
    visit_type_id: i64,
    room_id: i64,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: AppointmentStatus,
    note: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO appointments (id, patient_id, doctor_id, visit_type_id, room_id, start_at, end_at, status, note)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(patient_id)
    .bind(doctor_id)
    .bind(visit_type_id)
    .bind(room_id)
    .bind(start_at)
    .bind(end_at)
    .bind(status)
    .bind(note)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
