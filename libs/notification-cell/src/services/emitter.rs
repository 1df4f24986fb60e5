use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use shared_database::Database;

use crate::models::{Notification, NotificationError, NotificationKind};

/// Record a pending notification on an open connection. Booking-engine
/// transitions call this inside their own transaction so the notification
/// commits or rolls back together with the state change that caused it.
pub async fn insert_pending(
    conn: &mut SqliteConnection,
    kind: NotificationKind,
    message: &str,
    appointment_id: Option<Uuid>,
    patient_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO notifications (kind, message, created_at, sent_at, appointment_id, patient_id)
         VALUES (?, ?, ?, NULL, ?, ?)",
    )
    .bind(kind)
    .bind(message)
    .bind(Utc::now())
    .bind(appointment_id)
    .bind(patient_id)
    .execute(conn)
    .await?;

    debug!("Recorded pending {} notification", kind);
    Ok(result.last_insert_rowid())
}

pub struct NotificationService {
    db: Database,
}

impl NotificationService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn record_pending(
        &self,
        kind: NotificationKind,
        message: &str,
        appointment_id: Option<Uuid>,
        patient_id: Option<Uuid>,
    ) -> Result<i64, NotificationError> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        insert_pending(&mut conn, kind, message, appointment_id, patient_id)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    /// Pending notifications, oldest first, capped at `limit`.
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<Notification>, NotificationError> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, kind, message, created_at, sent_at, appointment_id, patient_id
             FROM notifications WHERE sent_at IS NULL
             ORDER BY created_at ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    /// Stamp a notification as sent. Returns false when it does not exist
    /// or was already sent; stamping is not repeatable.
    pub async fn mark_sent(&self, notification_id: i64) -> Result<bool, NotificationError> {
        let result = sqlx::query(
            "UPDATE notifications SET sent_at = ? WHERE id = ? AND sent_at IS NULL",
        )
        .bind(Utc::now())
        .bind(notification_id)
        .execute(self.db.pool())
        .await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
