use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, AppointmentType, BookingPolicy, ScheduleAppointmentRequest,
};
use appointment_cell::services::slots::find_alternative_slots;
use doctor_cell::models::Doctor;

// Monday 2025-06-02 08:00 UTC
fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

fn test_doctor() -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        doctor_number: "DR25060001".to_string(),
        first_name: "Asha".to_string(),
        last_name: "Menon".to_string(),
        specialization: "cardiology".to_string(),
        email: None,
        phone_number: None,
        consultation_fee: Some(500.0),
        working_start: "09:00:00".parse().unwrap(),
        working_end: "18:00:00".parse().unwrap(),
        working_days: vec![1, 2, 3, 4, 5],
        max_appointments_per_day: 20,
        is_active: true,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

fn request_for(date: &str) -> ScheduleAppointmentRequest {
    ScheduleAppointmentRequest {
        patient_id: Some(Uuid::new_v4()),
        doctor_id: Some(Uuid::new_v4()),
        appointment_date: Some(date.parse().unwrap()),
        appointment_time: Some("10:00:00".parse().unwrap()),
        duration_minutes: Some(30),
        appointment_type: AppointmentType::Consultation,
        symptoms: None,
        chief_complaint: None,
        notes: None,
    }
}

fn busy_slot(doctor_id: Uuid, date: &str, time: &str, duration: i32) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        appointment_number: "APT202506030001".to_string(),
        patient_id: Uuid::new_v4(),
        doctor_id,
        appointment_date: date.parse().unwrap(),
        appointment_time: time.parse().unwrap(),
        duration_minutes: duration,
        appointment_type: AppointmentType::Consultation,
        status: AppointmentStatus::Scheduled,
        symptoms: None,
        chief_complaint: None,
        notes: None,
        prescriptions: None,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

#[test]
fn empty_calendar_yields_earliest_slots_in_order() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    // Tuesday
    let request = request_for("2025-06-03");

    let suggestions = find_alternative_slots(&policy, &request, &doctor, &[], fixed_now(), 5);

    assert_eq!(suggestions.len(), 5);
    assert_eq!(suggestions[0].date, "2025-06-03".parse().unwrap());
    assert_eq!(suggestions[0].time, "09:00:00".parse().unwrap());
    assert_eq!(suggestions[1].time, "09:30:00".parse().unwrap());
    assert_eq!(suggestions[4].time, "11:00:00".parse().unwrap());
    assert_eq!(suggestions[0].doctor_name, "Asha Menon");
}

#[test]
fn busy_interval_is_skipped() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    let request = request_for("2025-06-03");

    // 09:00-10:00 is taken; first free slot is 10:00
    let existing = vec![busy_slot(doctor.id, "2025-06-03", "09:00:00", 60)];

    let suggestions = find_alternative_slots(&policy, &request, &doctor, &existing, fixed_now(), 5);

    assert_eq!(suggestions[0].time, "10:00:00".parse().unwrap());
}

#[test]
fn weekend_days_are_skipped() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    // Saturday; first usable day in the window is Monday 2025-06-09
    let request = request_for("2025-06-07");

    let suggestions = find_alternative_slots(&policy, &request, &doctor, &[], fixed_now(), 5);

    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].date, "2025-06-09".parse().unwrap());
    for suggestion in &suggestions {
        assert!(!matches!(suggestion.date.weekday(), Weekday::Sat | Weekday::Sun));
    }
}

#[test]
fn respects_max_suggestions() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    let request = request_for("2025-06-03");

    let suggestions = find_alternative_slots(&policy, &request, &doctor, &[], fixed_now(), 3);
    assert_eq!(suggestions.len(), 3);
}

#[test]
fn same_inputs_same_suggestions() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    let request = request_for("2025-06-03");
    let existing = vec![busy_slot(doctor.id, "2025-06-03", "09:30:00", 30)];

    let first = find_alternative_slots(&policy, &request, &doctor, &existing, fixed_now(), 5);
    let second = find_alternative_slots(&policy, &request, &doctor, &existing, fixed_now(), 5);
    assert_eq!(first, second);
}

#[test]
fn same_day_slots_honor_lead_time() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    // Tuesday 09:10; same-day candidates before 11:10 fail the 2h lead
    let now = Utc.with_ymd_and_hms(2025, 6, 3, 9, 10, 0).unwrap();
    let request = request_for("2025-06-03");

    let suggestions = find_alternative_slots(&policy, &request, &doctor, &[], now, 5);

    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].date, "2025-06-03".parse().unwrap());
    assert_eq!(suggestions[0].time, "11:30:00".parse().unwrap());
}

#[test]
fn fully_booked_window_yields_nothing() {
    let policy = BookingPolicy::default();
    let doctor = test_doctor();
    let request = request_for("2025-06-03");

    // Block every business day of the window 09:00-18:00
    let mut existing = Vec::new();
    for offset in 0..7 {
        let date = "2025-06-03".parse::<chrono::NaiveDate>().unwrap() + chrono::Duration::days(offset);
        existing.push(busy_slot(
            doctor.id,
            &date.format("%Y-%m-%d").to_string(),
            "09:00:00",
            9 * 60,
        ));
    }

    let suggestions = find_alternative_slots(&policy, &request, &doctor, &existing, fixed_now(), 5);
    assert!(suggestions.is_empty());
}
