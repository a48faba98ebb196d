use assert_matches::assert_matches;
use chrono::{Datelike, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{CreateDoctorRequest, DoctorError, DoctorSearchQuery};
use doctor_cell::services::doctor::{format_doctor_number, DoctorService};
use shared_utils::test_utils::TestConfig;

fn doctor_json(doctor_id: Uuid, doctor_number: &str) -> serde_json::Value {
    json!({
        "id": doctor_id,
        "doctor_number": doctor_number,
        "first_name": "Asha",
        "last_name": "Menon",
        "specialization": "cardiology",
        "email": "asha.menon@example.com",
        "phone_number": null,
        "consultation_fee": 500.0,
        "working_start": "09:00:00",
        "working_end": "18:00:00",
        "working_days": [1, 2, 3, 4, 5],
        "max_appointments_per_day": 20,
        "is_active": true,
        "created_at": "2025-01-15T09:00:00Z",
        "updated_at": "2025-01-15T09:00:00Z"
    })
}

#[test]
fn doctor_number_is_month_scoped_and_padded() {
    let date = "2025-06-15".parse().unwrap();
    assert_eq!(format_doctor_number(date, 1), "DR25060001");
    assert_eq!(format_doctor_number(date, 42), "DR25060042");

    let december = "2031-12-01".parse().unwrap();
    assert_eq!(format_doctor_number(december, 9999), "DR31129999");
}

#[tokio::test]
async fn create_doctor_assigns_next_sequence_number() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let today = Utc::now().date_naive();
    // Three doctors already registered this month
    let expected_number = format_doctor_number(today, 4);
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("select", "id"))
        .and(query_param(
            "doctor_number",
            format!("like.DR{:02}{:02}*", today.year() % 100, today.month()),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    // Insert must carry the derived number
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .and(body_partial_json(json!({ "doctor_number": expected_number })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            doctor_json(doctor_id, &expected_number)
        ])))
        .mount(&mock_server)
        .await;

    let request = CreateDoctorRequest {
        first_name: "Asha".to_string(),
        last_name: "Menon".to_string(),
        specialization: "cardiology".to_string(),
        email: Some("asha.menon@example.com".to_string()),
        phone_number: None,
        consultation_fee: Some(500.0),
        working_start: None,
        working_end: None,
        working_days: None,
        max_appointments_per_day: None,
    };

    let service = DoctorService::new(&config);
    let doctor = service.create_doctor(request, "test-token").await.unwrap();

    assert_eq!(doctor.doctor_number, expected_number);
    assert_eq!(doctor.id, doctor_id);
}

#[tokio::test]
async fn create_doctor_requires_specialization() {
    let config = TestConfig::default().to_app_config();

    let request = CreateDoctorRequest {
        first_name: "Asha".to_string(),
        last_name: "Menon".to_string(),
        specialization: "".to_string(),
        email: None,
        phone_number: None,
        consultation_fee: None,
        working_start: None,
        working_end: None,
        working_days: None,
        max_appointments_per_day: None,
    };

    let service = DoctorService::new(&config);
    let result = service.create_doctor(request, "test-token").await;

    assert_matches!(result, Err(DoctorError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = DoctorService::new(&config);
    let result = service.get_doctor(Uuid::new_v4(), "test-token").await;

    assert_matches!(result, Err(DoctorError::NotFound));
}

#[tokio::test]
async fn search_filters_by_specialization() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("order", "doctor_number.asc"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_json(Uuid::new_v4(), "DR25060001")
        ])))
        .mount(&mock_server)
        .await;

    let service = DoctorService::new(&config);
    let doctors = service
        .search_doctors(
            DoctorSearchQuery {
                specialization: Some("cardiology".to_string()),
                search: None,
                is_active: None,
                page: None,
                limit: None,
            },
            "test-token",
        )
        .await
        .unwrap();

    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0].specialization, "cardiology");
}
