use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Database;

use crate::models::{
    CreateDoctorRequest, CreateRoomRequest, CreateVisitTypeRequest, Doctor, Room,
    RoomWithEquipment, VisitType, DirectoryError,
};

pub struct DirectoryService {
    db: Database,
}

impl DirectoryService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DirectoryError> {
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        let specialty = request.specialty.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() || specialty.is_empty() {
            return Err(DirectoryError::ValidationError(
                "Name and specialty are required".to_string(),
            ));
        }

        let doctor = Doctor {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            specialty,
            phone: request.phone,
            email: request.email,
            active: true,
        };

        sqlx::query(
            "INSERT INTO doctors (id, first_name, last_name, specialty, phone, email, active)
             VALUES (?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(doctor.id)
        .bind(&doctor.first_name)
        .bind(&doctor.last_name)
        .bind(&doctor.specialty)
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .execute(self.db.pool())
        .await
        .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        info!("Created doctor {} ({})", doctor.id, doctor.specialty);
        Ok(doctor)
    }

    pub async fn list_active_doctors(&self) -> Result<Vec<Doctor>, DirectoryError> {
        sqlx::query_as::<_, Doctor>(
            "SELECT id, first_name, last_name, specialty, phone, email, active
             FROM doctors WHERE active = 1 ORDER BY last_name, first_name",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| DirectoryError::DatabaseError(e.to_string()))
    }

    /// Delete a doctor and everything they own, explicit cascade in one
    /// transaction like the patient-side delete.
    pub async fn delete_doctor(&self, doctor_id: Uuid) -> Result<bool, DirectoryError> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM doctors WHERE id = ?")
            .bind(doctor_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if exists.is_none() {
            debug!("Delete requested for unknown doctor {}", doctor_id);
            return Ok(false);
        }

        sqlx::query(
            "DELETE FROM notifications
             WHERE appointment_id IN (SELECT id FROM appointments WHERE doctor_id = ?)",
        )
        .bind(doctor_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM appointments WHERE doctor_id = ?")
            .bind(doctor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM waitlist_entries WHERE doctor_id = ?")
            .bind(doctor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM doctors WHERE id = ?")
            .bind(doctor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        info!("Deleted doctor {} and owned records", doctor_id);
        Ok(true)
    }

    pub async fn create_room(&self, request: CreateRoomRequest) -> Result<RoomWithEquipment, DirectoryError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DirectoryError::ValidationError(
                "Room name is required".to_string(),
            ));
        }

        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let insert = sqlx::query("INSERT INTO rooms (name, active) VALUES (?, 1)")
            .bind(&name)
            .execute(&mut *tx)
            .await;

        let room_id = match insert {
            Ok(result) => result.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(DirectoryError::NameAlreadyExists {
                    entity: "Room",
                    name,
                });
            }
            Err(e) => return Err(DirectoryError::DatabaseError(e.to_string())),
        };

        for equipment in &request.equipment {
            sqlx::query("INSERT INTO room_equipment (room_id, name) VALUES (?, ?)")
                .bind(room_id)
                .bind(equipment)
                .execute(&mut *tx)
                .await
                .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        info!("Created room {} ({})", room_id, name);
        Ok(RoomWithEquipment {
            id: room_id,
            name,
            active: true,
            equipment: request.equipment,
        })
    }

    pub async fn list_active_rooms(&self) -> Result<Vec<RoomWithEquipment>, DirectoryError> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT id, name, active FROM rooms WHERE active = 1 ORDER BY name",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let mut listed = Vec::with_capacity(rooms.len());
        for room in rooms {
            let equipment = sqlx::query_scalar::<_, String>(
                "SELECT name FROM room_equipment WHERE room_id = ? ORDER BY name",
            )
            .bind(room.id)
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

            listed.push(RoomWithEquipment {
                id: room.id,
                name: room.name,
                active: room.active,
                equipment,
            });
        }

        Ok(listed)
    }

    pub async fn create_visit_type(
        &self,
        request: CreateVisitTypeRequest,
    ) -> Result<VisitType, DirectoryError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DirectoryError::ValidationError(
                "Visit type name is required".to_string(),
            ));
        }
        if request.duration_minutes <= 0 {
            return Err(DirectoryError::ValidationError(
                "Visit duration must be positive".to_string(),
            ));
        }

        let insert = sqlx::query("INSERT INTO visit_types (name, duration_minutes) VALUES (?, ?)")
            .bind(&name)
            .bind(request.duration_minutes)
            .execute(self.db.pool())
            .await;

        match insert {
            Ok(result) => Ok(VisitType {
                id: result.last_insert_rowid(),
                name,
                duration_minutes: request.duration_minutes,
            }),
            Err(e) if is_unique_violation(&e) => Err(DirectoryError::NameAlreadyExists {
                entity: "Visit type",
                name,
            }),
            Err(e) => Err(DirectoryError::DatabaseError(e.to_string())),
        }
    }

    pub async fn list_visit_types(&self) -> Result<Vec<VisitType>, DirectoryError> {
        sqlx::query_as::<_, VisitType>(
            "SELECT id, name, duration_minutes FROM visit_types ORDER BY name",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| DirectoryError::DatabaseError(e.to_string()))
    }

    /// Idempotent base catalog so a fresh install can take bookings right
    /// away. Runs at startup; does nothing once any visit type exists.
    pub async fn seed_defaults(&self) -> Result<(), DirectoryError> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visit_types")
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if existing > 0 {
            debug!("Catalog already seeded, skipping");
            return Ok(());
        }

        for (name, duration) in [("Checkup", 30_i64), ("First visit", 45), ("Follow-up", 20)] {
            self.create_visit_type(CreateVisitTypeRequest {
                name: name.to_string(),
                duration_minutes: duration,
            })
            .await?;
        }

        for (name, equipment) in [
            ("Room 1", vec!["Examination table".to_string(), "ECG".to_string()]),
            ("Room 2", vec!["Examination table".to_string()]),
        ] {
            self.create_room(CreateRoomRequest {
                name: name.to_string(),
                equipment,
            })
            .await?;
        }

        for (first, last, specialty) in [
            ("Greta", "Rossi", "General Medicine"),
            ("Luca", "Ferrari", "Cardiology"),
        ] {
            self.create_doctor(CreateDoctorRequest {
                first_name: first.to_string(),
                last_name: last.to_string(),
                specialty: specialty.to_string(),
                phone: None,
                email: None,
            })
            .await?;
        }

        info!("Seeded base catalog");
        Ok(())
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
