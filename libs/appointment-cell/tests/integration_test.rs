use assert_matches::assert_matches;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentError, AppointmentType, BookingOutcome, ScheduleAppointmentRequest,
};
use appointment_cell::services::booking::{format_appointment_number, AppointmentBookingService};
use shared_utils::test_utils::TestConfig;

/// A weekday at least a week out, so lead-time and advance-window checks
/// pass regardless of when the test runs.
fn upcoming_weekday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    date
}

fn doctor_json(doctor_id: Uuid) -> serde_json::Value {
    json!({
        "id": doctor_id,
        "doctor_number": "DR25060001",
        "first_name": "Asha",
        "last_name": "Menon",
        "specialization": "cardiology",
        "email": "asha.menon@example.com",
        "phone_number": null,
        "consultation_fee": 500.0,
        "max_appointments_per_day": 20,
        "is_active": true,
        "created_at": "2025-01-15T09:00:00Z",
        "updated_at": "2025-01-15T09:00:00Z"
    })
}

fn appointment_json(
    doctor_id: Uuid,
    patient_id: Uuid,
    number: &str,
    date: NaiveDate,
    time: &str,
    duration: i32,
) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "appointment_number": number,
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "appointment_date": date.format("%Y-%m-%d").to_string(),
        "appointment_time": time,
        "duration_minutes": duration,
        "appointment_type": "consultation",
        "status": "scheduled",
        "symptoms": null,
        "chief_complaint": null,
        "notes": null,
        "prescriptions": null,
        "created_at": "2025-01-15T09:00:00Z",
        "updated_at": "2025-01-15T09:00:00Z"
    })
}

fn booking_request(doctor_id: Uuid, patient_id: Uuid, date: NaiveDate) -> ScheduleAppointmentRequest {
    ScheduleAppointmentRequest {
        patient_id: Some(patient_id),
        doctor_id: Some(doctor_id),
        appointment_date: Some(date),
        appointment_time: Some("10:00:00".parse().unwrap()),
        duration_minutes: Some(30),
        appointment_type: AppointmentType::Consultation,
        symptoms: Some("chest pain".to_string()),
        chief_complaint: None,
        notes: None,
    }
}

async fn mount_identity_mocks(server: &MockServer, doctor_id: Uuid, patient_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor_json(doctor_id)])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": patient_id }])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn booking_succeeds_on_free_calendar() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let date = upcoming_weekday();
    let today = Utc::now().date_naive();
    let expected_number = format_appointment_number(today, 1);

    mount_identity_mocks(&mock_server, doctor_id, patient_id).await;

    // No same-day appointments on either axis
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", format!("eq.{}", date.format("%Y-%m-%d"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Sequence lookup for today's appointment number
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_json(doctor_id, patient_id, &expected_number, date, "10:00:00", 30)
        ])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let outcome = service
        .schedule_appointment(booking_request(doctor_id, patient_id, date), "test-token")
        .await
        .unwrap();

    match outcome {
        BookingOutcome::Booked(appointment) => {
            assert_eq!(appointment.appointment_number, expected_number);
            assert_eq!(appointment.doctor_id, doctor_id);
        }
        BookingOutcome::Rejected { outcome, .. } => {
            panic!("expected booking, got rejection: {:?}", outcome.errors);
        }
    }
}

#[tokio::test]
async fn conflict_rejection_carries_alternative_slots() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let date = upcoming_weekday();

    mount_identity_mocks(&mock_server, doctor_id, patient_id).await;

    let conflicting = appointment_json(
        doctor_id, Uuid::new_v4(), "APT202506030001", date, "10:00:00", 30,
    );

    // Doctor already booked at the requested time
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", format!("eq.{}", date.format("%Y-%m-%d"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([conflicting.clone()])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Window fetch for the slot finder
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", format!("gte.{}", date.format("%Y-%m-%d"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([conflicting])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let outcome = service
        .schedule_appointment(booking_request(doctor_id, patient_id, date), "test-token")
        .await
        .unwrap();

    match outcome {
        BookingOutcome::Rejected { outcome, suggestions } => {
            assert!(outcome.errors.iter().any(|e| e.contains("conflicting appointment")));
            assert!(!suggestions.is_empty());
            assert!(suggestions.len() <= 5);
            // No suggestion may land on the taken 10:00-10:30 interval
            for suggestion in &suggestions {
                assert!(
                    !(suggestion.date == date && suggestion.time == "10:00:00".parse().unwrap()),
                    "suggested the conflicting slot"
                );
            }
        }
        BookingOutcome::Booked(_) => panic!("expected rejection"),
    }
}

#[tokio::test]
async fn daily_cap_rejection_triggers_suggestion_search() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let date = upcoming_weekday();

    mount_identity_mocks(&mock_server, doctor_id, patient_id).await;

    // Doctor is at the default cap of 20. The bookings are 15-minute slots
    // from 12:00 so none overlaps the 10:00 request; only the cap fires.
    let day_full: Vec<serde_json::Value> = (0..20)
        .map(|i| {
            let minute = 12 * 60 + i * 15;
            let time = format!("{:02}:{:02}:00", minute / 60, minute % 60);
            appointment_json(doctor_id, Uuid::new_v4(), "APT202503100001", date, &time, 15)
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", format!("eq.{}", date.format("%Y-%m-%d"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(day_full)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Next day is wide open for suggestions
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", format!("gte.{}", date.format("%Y-%m-%d"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(day_full)))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let outcome = service
        .schedule_appointment(booking_request(doctor_id, patient_id, date), "test-token")
        .await
        .unwrap();

    match outcome {
        BookingOutcome::Rejected { outcome, suggestions } => {
            assert!(outcome.errors.iter().any(|e| e.contains("maximum daily appointment limit of 20")));
            assert!(!suggestions.is_empty());
        }
        BookingOutcome::Booked(_) => panic!("expected rejection at the daily cap"),
    }
}

#[tokio::test]
async fn policy_rejection_skips_backend_entirely() {
    // Weekend request fails basic validation before any fetch, so no mocks
    let config = TestConfig::default().to_app_config();

    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday() != Weekday::Sat {
        date += Duration::days(1);
    }

    let service = AppointmentBookingService::new(&config);
    let outcome = service
        .schedule_appointment(booking_request(Uuid::new_v4(), Uuid::new_v4(), date), "test-token")
        .await
        .unwrap();

    match outcome {
        BookingOutcome::Rejected { outcome, suggestions } => {
            assert!(outcome.errors.iter().any(|e| e.contains("weekends")));
            assert!(suggestions.is_empty());
        }
        BookingOutcome::Booked(_) => panic!("expected rejection"),
    }
}

#[tokio::test]
async fn unknown_doctor_is_an_error_not_a_rejection() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let result = service
        .schedule_appointment(
            booking_request(doctor_id, Uuid::new_v4(), upcoming_weekday()),
            "test-token",
        )
        .await;

    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
}

#[tokio::test]
async fn cancel_flips_status_without_delete() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let date = upcoming_weekday();
    let appointment_id = Uuid::new_v4();

    let mut current = appointment_json(doctor_id, patient_id, "APT202506030001", date, "10:00:00", 30);
    current["id"] = json!(appointment_id);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current.clone()])))
        .mount(&mock_server)
        .await;

    let mut cancelled = current.clone();
    cancelled["status"] = json!("cancelled");
    cancelled["notes"] = json!("Cancelled: patient request");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let appointment = service
        .cancel_appointment(
            appointment_id,
            appointment_cell::models::CancelAppointmentRequest {
                reason: Some("patient request".to_string()),
            },
            "test-token",
        )
        .await
        .unwrap();

    assert!(appointment.is_cancelled());
}

#[tokio::test]
async fn cancelling_a_completed_appointment_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let appointment_id = Uuid::new_v4();
    let mut current = appointment_json(
        Uuid::new_v4(), Uuid::new_v4(), "APT202506030001", upcoming_weekday(), "10:00:00", 30,
    );
    current["id"] = json!(appointment_id);
    current["status"] = json!("completed");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let result = service
        .cancel_appointment(
            appointment_id,
            appointment_cell::models::CancelAppointmentRequest { reason: None },
            "test-token",
        )
        .await;

    assert_matches!(result, Err(AppointmentError::InvalidStatusTransition(_)));
}
