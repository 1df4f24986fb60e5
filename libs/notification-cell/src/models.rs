use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// RESCHEDULE is carried for parity with the persisted ledger but no engine
/// transition currently emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Reminder,
    Confirmation,
    Cancellation,
    Reschedule,
    WaitlistPromoted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Reminder => write!(f, "REMINDER"),
            NotificationKind::Confirmation => write!(f, "CONFIRMATION"),
            NotificationKind::Cancellation => write!(f, "CANCELLATION"),
            NotificationKind::Reschedule => write!(f, "RESCHEDULE"),
            NotificationKind::WaitlistPromoted => write!(f, "WAITLIST_PROMOTED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub appointment_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

impl Notification {
    pub fn is_pending(&self) -> bool {
        self.sent_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
