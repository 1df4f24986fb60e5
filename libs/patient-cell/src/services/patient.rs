use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Database;

use crate::models::{CreatePatientRequest, Patient, PatientError};

pub struct PatientService {
    db: Database,
}

impl PatientService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(PatientError::ValidationError(
                "First name and last name are required".to_string(),
            ));
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            birth_date: request.birth_date,
            phone: request.phone,
            email: request.email,
            fiscal_code: request.fiscal_code,
        };

        let insert = sqlx::query(
            "INSERT INTO patients (id, first_name, last_name, birth_date, phone, email, fiscal_code)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.birth_date)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.fiscal_code)
        .execute(self.db.pool())
        .await;

        match insert {
            Ok(_) => {
                info!("Created patient {}", patient.id);
                Ok(patient)
            }
            Err(e) if is_unique_violation(&e) => Err(PatientError::FiscalCodeAlreadyExists {
                fiscal_code: patient.fiscal_code.unwrap_or_default(),
            }),
            Err(e) => Err(PatientError::DatabaseError(e.to_string())),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        sqlx::query_as::<_, Patient>(
            "SELECT id, first_name, last_name, birth_date, phone, email, fiscal_code
             FROM patients ORDER BY last_name, first_name",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        sqlx::query_as::<_, Patient>(
            "SELECT id, first_name, last_name, birth_date, phone, email, fiscal_code
             FROM patients WHERE id = ?",
        )
        .bind(patient_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| PatientError::DatabaseError(e.to_string()))?
        .ok_or(PatientError::NotFound)
    }

    /// Delete a patient and everything they own. The cascade is explicit and
    /// runs inside one transaction: notifications first, then appointments
    /// and waitlist entries, then the patient row itself.
    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<bool, PatientError> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM patients WHERE id = ?")
            .bind(patient_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if exists.is_none() {
            debug!("Delete requested for unknown patient {}", patient_id);
            return Ok(false);
        }

        sqlx::query(
            "DELETE FROM notifications
             WHERE patient_id = ?
                OR appointment_id IN (SELECT id FROM appointments WHERE patient_id = ?)",
        )
        .bind(patient_id)
        .bind(patient_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM appointments WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM waitlist_entries WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(patient_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        info!("Deleted patient {} and owned records", patient_id);
        Ok(true)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
