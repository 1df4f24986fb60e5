use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingError,
};
use appointment_cell::services::BookingService;
use notification_cell::models::{Notification, NotificationKind};
use shared_database::Database;
use shared_utils::test_utils::{insert_patient, insert_visit_type, seed_catalog, CatalogIds};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 14, hour, minute, 0).unwrap()
}

fn request(ids: &CatalogIds, start: DateTime<Utc>, allow_waitlist: bool) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: ids.patient_id,
        doctor_id: ids.doctor_id,
        visit_type_id: ids.visit_type_id,
        room_id: ids.room_id,
        start_at: start,
        note: None,
        allow_waitlist,
    }
}

async fn fetch_appointment(db: &Database, id: Uuid) -> Appointment {
    sqlx::query_as::<_, Appointment>(
        "SELECT id, patient_id, doctor_id, visit_type_id, room_id, start_at, end_at, status, note
         FROM appointments WHERE id = ?",
    )
    .bind(id)
    .fetch_one(db.pool())
    .await
    .unwrap()
}

async fn notification_kinds(db: &Database) -> Vec<NotificationKind> {
    sqlx::query_as::<_, Notification>(
        "SELECT id, kind, message, created_at, sent_at, appointment_id, patient_id
         FROM notifications ORDER BY id ASC",
    )
    .fetch_all(db.pool())
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.kind)
    .collect()
}

async fn waitlist_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM waitlist_entries")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn booking_computes_end_from_visit_type_duration() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let outcome = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();

    assert!(outcome.ok);
    assert!(!outcome.waitlisted);
    let appointment = fetch_appointment(&db, outcome.appointment_id.unwrap()).await;
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.end_at, at(10, 30));

    // A 45-minute visit type yields a 45-minute appointment.
    let long_visit = insert_visit_type(&db, "First visit", 45).await;
    let mut second = request(&ids, at(14, 0), true);
    second.visit_type_id = long_visit;
    let outcome = service.book_appointment(second).await.unwrap();
    let appointment = fetch_appointment(&db, outcome.appointment_id.unwrap()).await;
    assert_eq!(appointment.end_at - appointment.start_at, Duration::minutes(45));
}

#[tokio::test]
async fn booking_emits_confirmation_referencing_the_appointment() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let outcome = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT id, kind, message, created_at, sent_at, appointment_id, patient_id
         FROM notifications",
    )
    .fetch_all(db.pool())
    .await
    .unwrap();

    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Confirmation);
    assert_eq!(notifications[0].appointment_id, outcome.appointment_id);
    assert_eq!(notifications[0].patient_id, Some(ids.patient_id));
    assert!(notifications[0].sent_at.is_none());
}

#[tokio::test]
async fn unknown_visit_type_fails_with_no_side_effects() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let mut bad = request(&ids, at(10, 0), true);
    bad.visit_type_id = 999;

    assert_matches!(
        service.book_appointment(bad).await.unwrap_err(),
        BookingError::InvalidVisitType
    );

    let appointments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(appointments, 0);
    assert!(notification_kinds(&db).await.is_empty());
}

#[tokio::test]
async fn overlapping_doctor_booking_goes_to_waitlist() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();

    // Overlaps 10:00-10:30 for the same doctor.
    let second_patient = insert_patient(&db, "Marco", "Neri").await;
    let mut overlapping = request(&ids, at(10, 15), true);
    overlapping.patient_id = second_patient;

    let outcome = service.book_appointment(overlapping).await.unwrap();

    assert!(outcome.ok);
    assert!(outcome.waitlisted);
    assert!(outcome.appointment_id.is_none());
    assert_eq!(waitlist_count(&db).await, 1);
    assert_eq!(
        notification_kinds(&db).await,
        vec![NotificationKind::Confirmation, NotificationKind::Reminder]
    );

    // The reminder is not tied to any appointment.
    let reminder_ref: Option<Uuid> = sqlx::query_scalar(
        "SELECT appointment_id FROM notifications WHERE kind = 'REMINDER'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert!(reminder_ref.is_none());
}

#[tokio::test]
async fn overlapping_room_booking_conflicts_even_with_another_doctor() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();

    let other_doctor = shared_utils::test_utils::insert_doctor(&db, "Luca", "Ferrari", "Cardiology").await;
    let mut same_room = request(&ids, at(10, 15), false);
    same_room.doctor_id = other_doctor;

    let outcome = service.book_appointment(same_room).await.unwrap();
    assert!(!outcome.ok);
    assert!(!outcome.waitlisted);
}

#[tokio::test]
async fn back_to_back_bookings_do_not_conflict() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    service.book_appointment(request(&ids, at(10, 0), false)).await.unwrap();

    // [10:00,10:30) and [10:30,11:00) share only the boundary instant.
    let outcome = service.book_appointment(request(&ids, at(10, 30), false)).await.unwrap();
    assert!(outcome.ok);
}

#[tokio::test]
async fn conflict_without_waitlist_has_no_side_effects() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();

    let outcome = service.book_appointment(request(&ids, at(10, 0), false)).await.unwrap();

    assert!(!outcome.ok);
    assert!(outcome.appointment_id.is_none());
    assert_eq!(waitlist_count(&db).await, 0);
    assert_eq!(notification_kinds(&db).await, vec![NotificationKind::Confirmation]);
}

#[tokio::test]
async fn concurrent_bookings_for_same_slot_yield_one_appointment() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;

    let first = BookingService::new(&db);
    let second = BookingService::new(&db);
    let second_patient = insert_patient(&db, "Marco", "Neri").await;

    let mut competing = request(&ids, at(10, 0), false);
    competing.patient_id = second_patient;

    let (a, b) = tokio::join!(
        first.book_appointment(request(&ids, at(10, 0), false)),
        second.book_appointment(competing),
    );

    let successes = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|outcome| outcome.ok)
        .count();
    assert_eq!(successes, 1);

    let confirmed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE status = 'CONFIRMED'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(confirmed, 1);
}

#[tokio::test]
async fn cancel_is_idempotent_safe() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    // Nonexistent appointment.
    assert!(!service.cancel_appointment(Uuid::new_v4(), None).await.unwrap());

    let outcome = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();
    let appointment_id = outcome.appointment_id.unwrap();

    assert!(service.cancel_appointment(appointment_id, Some("patient request")).await.unwrap());
    // Second cancel does nothing and emits nothing.
    assert!(!service.cancel_appointment(appointment_id, None).await.unwrap());

    assert_eq!(
        notification_kinds(&db).await,
        vec![NotificationKind::Confirmation, NotificationKind::Cancellation]
    );
}

#[tokio::test]
async fn cancellation_promotes_the_waitlisted_patient_into_the_freed_slot() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    // First patient takes 10:00-10:30.
    let outcome = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();
    let first_appointment = outcome.appointment_id.unwrap();

    // Second patient tries 10:15, overlaps, lands on the waitlist.
    let second_patient = insert_patient(&db, "Marco", "Neri").await;
    let mut overlapping = request(&ids, at(10, 15), true);
    overlapping.patient_id = second_patient;
    let outcome = service.book_appointment(overlapping).await.unwrap();
    assert!(outcome.waitlisted);

    // Cancelling the first appointment frees 10:00-10:30 and promotes.
    assert!(service.cancel_appointment(first_appointment, Some("no show")).await.unwrap());

    let cancelled = fetch_appointment(&db, first_appointment).await;
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let promoted = sqlx::query_as::<_, Appointment>(
        "SELECT id, patient_id, doctor_id, visit_type_id, room_id, start_at, end_at, status, note
         FROM appointments WHERE patient_id = ?",
    )
    .bind(second_patient)
    .fetch_one(db.pool())
    .await
    .unwrap();

    assert_eq!(promoted.status, AppointmentStatus::Confirmed);
    assert_eq!(promoted.start_at, at(10, 0));
    assert_eq!(promoted.end_at, at(10, 30));

    assert_eq!(waitlist_count(&db).await, 0);

    // Causal order of the whole flow.
    assert_eq!(
        notification_kinds(&db).await,
        vec![
            NotificationKind::Confirmation,
            NotificationKind::Reminder,
            NotificationKind::Cancellation,
            NotificationKind::WaitlistPromoted,
        ]
    );
}

#[tokio::test]
async fn promotion_prefers_lower_priority_then_older_entry() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let outcome = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();
    let appointment_id = outcome.appointment_id.unwrap();

    let urgent_patient = insert_patient(&db, "Paola", "Russo").await;
    let routine_patient = insert_patient(&db, "Marco", "Neri").await;

    // Routine entry is older but has a weaker priority.
    sqlx::query(
        "INSERT INTO waitlist_entries (patient_id, doctor_id, visit_type_id, priority, entered_at)
         VALUES (?, ?, ?, 5, ?)",
    )
    .bind(routine_patient)
    .bind(ids.doctor_id)
    .bind(ids.visit_type_id)
    .bind(at(8, 0))
    .execute(db.pool())
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO waitlist_entries (patient_id, doctor_id, visit_type_id, priority, entered_at)
         VALUES (?, ?, ?, 2, ?)",
    )
    .bind(urgent_patient)
    .bind(ids.doctor_id)
    .bind(ids.visit_type_id)
    .bind(at(9, 0))
    .execute(db.pool())
    .await
    .unwrap();

    service.cancel_appointment(appointment_id, None).await.unwrap();

    let promoted_patient: Uuid = sqlx::query_scalar(
        "SELECT patient_id FROM appointments WHERE status = 'CONFIRMED' AND start_at = ?",
    )
    .bind(at(10, 0))
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(promoted_patient, urgent_patient);

    // The weaker-priority entry stays queued.
    assert_eq!(waitlist_count(&db).await, 1);
}

#[tokio::test]
async fn promotion_breaks_priority_ties_by_insertion_time() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let outcome = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();
    let appointment_id = outcome.appointment_id.unwrap();

    let late_patient = insert_patient(&db, "Paola", "Russo").await;
    let early_patient = insert_patient(&db, "Marco", "Neri").await;

    for (patient, entered) in [(late_patient, at(9, 0)), (early_patient, at(8, 0))] {
        sqlx::query(
            "INSERT INTO waitlist_entries (patient_id, doctor_id, visit_type_id, priority, entered_at)
             VALUES (?, ?, ?, 5, ?)",
        )
        .bind(patient)
        .bind(ids.doctor_id)
        .bind(ids.visit_type_id)
        .bind(entered)
        .execute(db.pool())
        .await
        .unwrap();
    }

    service.cancel_appointment(appointment_id, None).await.unwrap();

    let promoted_patient: Uuid = sqlx::query_scalar(
        "SELECT patient_id FROM appointments WHERE status = 'CONFIRMED' AND start_at = ?",
    )
    .bind(at(10, 0))
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(promoted_patient, early_patient);
}

#[tokio::test]
async fn promotion_skips_a_reoccupied_slot() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let first = service.book_appointment(request(&ids, at(10, 0), true)).await.unwrap();

    let waiting_patient = insert_patient(&db, "Marco", "Neri").await;
    let mut overlapping = request(&ids, at(10, 15), true);
    overlapping.patient_id = waiting_patient;
    assert!(service.book_appointment(overlapping).await.unwrap().waitlisted);

    // Occupy the doctor 10:15-10:45 behind the engine's back so the freed
    // 10:00-10:30 window is no longer clear when promotion re-checks it.
    let second_room = shared_utils::test_utils::insert_room(&db, "Room 2").await;
    let blocker = insert_patient(&db, "Paola", "Russo").await;
    sqlx::query(
        "INSERT INTO appointments (id, patient_id, doctor_id, visit_type_id, room_id, start_at, end_at, status)
         VALUES (?, ?, ?, ?, ?, ?, ?, 'CONFIRMED')",
    )
    .bind(Uuid::new_v4())
    .bind(blocker)
    .bind(ids.doctor_id)
    .bind(ids.visit_type_id)
    .bind(second_room)
    .bind(at(10, 15))
    .bind(at(10, 45))
    .execute(db.pool())
    .await
    .unwrap();

    service.cancel_appointment(first.appointment_id.unwrap(), None).await.unwrap();

    // No promotion happened: the entry is still queued and the waiting
    // patient has no appointment.
    assert_eq!(waitlist_count(&db).await, 1);
    let promoted: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE patient_id = ?",
    )
    .bind(waiting_patient)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(promoted, 0);
}

#[tokio::test]
async fn cancelled_slot_can_be_rebooked_at_the_same_start() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let service = BookingService::new(&db);

    let outcome = service.book_appointment(request(&ids, at(10, 0), false)).await.unwrap();
    service.cancel_appointment(outcome.appointment_id.unwrap(), None).await.unwrap();

    // The cancelled row keeps (doctor, start) but must not block a rebooking.
    let rebooked = service.book_appointment(request(&ids, at(10, 0), false)).await.unwrap();
    assert!(rebooked.ok);
}
