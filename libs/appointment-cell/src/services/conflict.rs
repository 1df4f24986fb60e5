use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::AppointmentStatus;

/// Half-open interval overlap: [s1,e1) and [s2,e2) overlap iff
/// s1 < e2 and s2 < e1.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// A slot is free when no non-cancelled appointment for the same doctor OR
/// the same room overlaps it. Runs on the caller's connection so the check
/// and the insert that follows it share one transaction.
pub(crate) async fn slot_is_free(
    conn: &mut SqliteConnection,
    doctor_id: Uuid,
    room_id: i64,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let conflict = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM appointments
         WHERE status <> ?
           AND start_at < ?
           AND end_at > ?
           AND (doctor_id = ? OR room_id = ?)
         LIMIT 1",
    )
    .bind(AppointmentStatus::Cancelled)
    .bind(end_at)
    .bind(start_at)
    .bind(doctor_id)
    .bind(room_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(conflict.is_none())
}
