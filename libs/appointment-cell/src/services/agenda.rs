use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_database::Database;

use crate::models::{AgendaEntry, AppointmentStatus, BookingError};

pub struct AgendaService {
    db: Database,
}

#[derive(Debug, sqlx::FromRow)]
struct AgendaRow {
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: AppointmentStatus,
    note: Option<String>,
    room: String,
    visit_type: String,
}

impl AgendaService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// A doctor's calendar day: non-cancelled appointments, ascending by
    /// start time, flattened for display.
    pub async fn day_agenda(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<AgendaEntry>, BookingError> {
        debug!("Fetching agenda for doctor {} on {}", doctor_id, day);

        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + ChronoDuration::days(1);

        let rows = sqlx::query_as::<_, AgendaRow>(
            "SELECT a.start_at, a.end_at, a.status, a.note,
                    r.name AS room, v.name AS visit_type
             FROM appointments a
             JOIN rooms r ON r.id = a.room_id
             JOIN visit_types v ON v.id = a.visit_type_id
             WHERE a.doctor_id = ?
               AND a.start_at >= ?
               AND a.start_at < ?
               AND a.status <> ?
             ORDER BY a.start_at ASC",
        )
        .bind(doctor_id)
        .bind(day_start)
        .bind(day_end)
        .bind(AppointmentStatus::Cancelled)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AgendaEntry {
                start: row.start_at.format("%H:%M").to_string(),
                end: row.end_at.format("%H:%M").to_string(),
                status: row.status,
                note: row.note,
                room: row.room,
                visit_type: row.visit_type,
            })
            .collect())
    }
}
