use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use notification_cell::models::NotificationKind;
use notification_cell::services::insert_pending;

use crate::models::{AppointmentStatus, BookingError, WaitlistEntry};
use crate::services::booking::{fetch_visit_type, insert_appointment};
use crate::services::conflict::slot_is_free;

/// Fill the slot a cancellation just freed with the best waiting entry for
/// the same doctor and visit type. Best means lowest priority value, then
/// oldest insertion. Runs on the cancellation's transaction; it only fills
/// the literal freed slot, no wider rebalancing.
pub(crate) async fn promote_from_waitlist(
    conn: &mut SqliteConnection,
    doctor_id: Uuid,
    visit_type_id: i64,
    start_at: DateTime<Utc>,
    room_id: i64,
) -> Result<Option<Uuid>, BookingError> {
    let Some(visit_type) = fetch_visit_type(conn, visit_type_id).await? else {
        return Ok(None);
    };

    let end_at = start_at + ChronoDuration::minutes(visit_type.duration_minutes);

    if !slot_is_free(conn, doctor_id, room_id, start_at, end_at).await? {
        debug!(
            "Freed slot for doctor {} at {} already re-occupied, skipping promotion",
            doctor_id, start_at
        );
        return Ok(None);
    }

    let entry = sqlx::query_as::<_, WaitlistEntry>(
        "SELECT id, patient_id, doctor_id, visit_type_id, priority, entered_at, note
         FROM waitlist_entries
         WHERE doctor_id = ? AND visit_type_id = ?
         ORDER BY priority ASC, entered_at ASC, id ASC
         LIMIT 1",
    )
    .bind(doctor_id)
    .bind(visit_type_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(entry) = entry else {
        return Ok(None);
    };

    let appointment_id = insert_appointment(
        conn,
        entry.patient_id,
        doctor_id,
        visit_type_id,
        room_id,
        start_at,
        end_at,
        AppointmentStatus::Confirmed,
        Some("Automatically booked from the waitlist."),
    )
    .await?;

    let message = format!(
        "A slot freed up: appointment assigned for {}.",
        start_at.format("%Y-%m-%d %H:%M")
    );
    insert_pending(
        conn,
        NotificationKind::WaitlistPromoted,
        &message,
        Some(appointment_id),
        Some(entry.patient_id),
    )
    .await?;

    sqlx::query("DELETE FROM waitlist_entries WHERE id = ?")
        .bind(entry.id)
        .execute(&mut *conn)
        .await?;

    info!(
        "Promoted waitlist entry {} to appointment {} for patient {}",
        entry.id, appointment_id, entry.patient_id
    );

    Ok(Some(appointment_id))
}
