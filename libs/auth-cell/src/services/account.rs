use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Database;

use crate::models::{AuthError, UserAccount};
use crate::services::password::{hash_password, verify_password};

pub struct AccountService {
    db: Database,
}

impl AccountService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Create an account for a normalized username. The username is trimmed
    /// and lowercased before the uniqueness check.
    pub async fn register(&self, username: &str, password: &str) -> Result<Uuid, AuthError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM user_accounts WHERE username = ?",
        )
        .bind(&username)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if existing.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash =
            hash_password(password).map_err(|e| AuthError::HashingError(e.to_string()))?;

        let id = Uuid::new_v4();
        let insert = sqlx::query(
            "INSERT INTO user_accounts (id, username, password_hash, active, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(id)
        .bind(&username)
        .bind(&password_hash)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await;

        match insert {
            Ok(_) => {
                info!("Registered account {} for username {}", id, username);
                Ok(id)
            }
            // Two concurrent registrations can both pass the pre-check; the
            // unique index settles it.
            Err(e) if is_unique_violation(&e) => Err(AuthError::DuplicateUsername),
            Err(e) => Err(AuthError::DatabaseError(e.to_string())),
        }
    }

    /// Uniform no-match: callers cannot tell an unknown username from an
    /// inactive account or a wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserAccount>, AuthError> {
        let username = username.trim().to_lowercase();

        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, username, password_hash, active, created_at
             FROM user_accounts WHERE username = ?",
        )
        .bind(&username)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let account = match account {
            Some(a) if a.active => a,
            _ => {
                debug!("Authentication failed for username {}", username);
                return Ok(None);
            }
        };

        let matches = verify_password(password, &account.password_hash)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        if !matches {
            debug!("Authentication failed for username {}", username);
            return Ok(None);
        }

        Ok(Some(account))
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<UserAccount>, AuthError> {
        sqlx::query_as::<_, UserAccount>(
            "SELECT id, username, password_hash, active, created_at
             FROM user_accounts WHERE id = ?",
        )
        .bind(account_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
