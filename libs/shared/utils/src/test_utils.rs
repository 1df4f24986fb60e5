use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::Database;

use crate::jwt;

pub struct TestConfig {
    pub jwt_secret: String,
    pub jwt_expire_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-token-signing-must-be-long-enough".to_string(),
            jwt_expire_minutes: 60,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expire_minutes: self.jwt_expire_minutes,
            bind_port: 0,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(subject: &Uuid, username: &str, secret: &str) -> String {
        jwt::issue_token(&subject.to_string(), username, secret, 60)
            .expect("test token should sign")
    }

    pub fn create_expired_token(subject: &Uuid, username: &str, secret: &str) -> String {
        jwt::issue_token(&subject.to_string(), username, secret, -60)
            .expect("test token should sign")
    }

    pub fn create_invalid_signature_token(subject: &Uuid, username: &str) -> String {
        jwt::issue_token(&subject.to_string(), username, "wrong-secret", 60)
            .expect("test token should sign")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Ids of a minimal catalog inserted by [`seed_catalog`].
pub struct CatalogIds {
    pub doctor_id: Uuid,
    pub room_id: i64,
    pub visit_type_id: i64,
    pub patient_id: Uuid,
}

/// Insert one doctor, one room, one 30-minute visit type and one patient so
/// booking tests have a catalog to work against.
pub async fn seed_catalog(db: &Database) -> CatalogIds {
    let doctor_id = insert_doctor(db, "Greta", "Rossi", "General Medicine").await;
    let room_id = insert_room(db, "Room 1").await;
    let visit_type_id = insert_visit_type(db, "Checkup", 30).await;
    let patient_id = insert_patient(db, "Anna", "Bianchi").await;

    CatalogIds {
        doctor_id,
        room_id,
        visit_type_id,
        patient_id,
    }
}

pub async fn insert_doctor(db: &Database, first_name: &str, last_name: &str, specialty: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO doctors (id, first_name, last_name, specialty, active) VALUES (?, ?, ?, ?, 1)",
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(specialty)
    .execute(db.pool())
    .await
    .expect("doctor insert should succeed");
    id
}

pub async fn insert_room(db: &Database, name: &str) -> i64 {
    let result = sqlx::query("INSERT INTO rooms (name, active) VALUES (?, 1)")
        .bind(name)
        .execute(db.pool())
        .await
        .expect("room insert should succeed");
    result.last_insert_rowid()
}

pub async fn insert_visit_type(db: &Database, name: &str, duration_minutes: i64) -> i64 {
    let result = sqlx::query("INSERT INTO visit_types (name, duration_minutes) VALUES (?, ?)")
        .bind(name)
        .bind(duration_minutes)
        .execute(db.pool())
        .await
        .expect("visit type insert should succeed");
    result.last_insert_rowid()
}

pub async fn insert_patient(db: &Database, first_name: &str, last_name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO patients (id, first_name, last_name) VALUES (?, ?, ?)")
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .execute(db.pool())
        .await
        .expect("patient insert should succeed");
    id
}

