use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use appointment_cell::models::{AppointmentStatus, BookAppointmentRequest};
use appointment_cell::services::{AgendaService, BookingService};
use shared_database::Database;
use shared_utils::test_utils::{insert_doctor, seed_catalog, CatalogIds};

fn on(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, hour, minute, 0).unwrap()
}

fn request(ids: &CatalogIds, start: DateTime<Utc>, note: Option<&str>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: ids.patient_id,
        doctor_id: ids.doctor_id,
        visit_type_id: ids.visit_type_id,
        room_id: ids.room_id,
        start_at: start,
        note: note.map(str::to_string),
        allow_waitlist: false,
    }
}

#[tokio::test]
async fn agenda_is_filtered_ordered_and_flattened() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let booking = BookingService::new(&db);
    let agenda = AgendaService::new(&db);

    // Out of order on purpose; the agenda must sort by start time.
    booking.book_appointment(request(&ids, on(14, 15, 0), None)).await.unwrap();
    booking.book_appointment(request(&ids, on(14, 9, 0), Some("fasting"))).await.unwrap();

    // Cancelled appointments stay out of the agenda.
    let cancelled = booking
        .book_appointment(request(&ids, on(14, 11, 0), None))
        .await
        .unwrap();
    booking
        .cancel_appointment(cancelled.appointment_id.unwrap(), None)
        .await
        .unwrap();

    // Other days and other doctors stay out too.
    booking.book_appointment(request(&ids, on(15, 9, 0), None)).await.unwrap();
    let other_doctor = insert_doctor(&db, "Luca", "Ferrari", "Cardiology").await;
    let mut other = request(&ids, on(14, 16, 0), None);
    other.doctor_id = other_doctor;
    booking.book_appointment(other).await.unwrap();

    let day = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    let entries = agenda.day_agenda(ids.doctor_id, day).await.unwrap();

    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].start, "09:00");
    assert_eq!(entries[0].end, "09:30");
    assert_eq!(entries[0].status, AppointmentStatus::Confirmed);
    assert_eq!(entries[0].note.as_deref(), Some("fasting"));
    assert_eq!(entries[0].room, "Room 1");
    assert_eq!(entries[0].visit_type, "Checkup");

    assert_eq!(entries[1].start, "15:00");
    assert_eq!(entries[1].end, "15:30");
    assert_eq!(entries[1].note, None);
}

#[tokio::test]
async fn empty_day_yields_empty_agenda() {
    let db = Database::in_memory().await.unwrap();
    let ids = seed_catalog(&db).await;
    let agenda = AgendaService::new(&db);

    let day = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    assert!(agenda.day_agenda(ids.doctor_id, day).await.unwrap().is_empty());
}
