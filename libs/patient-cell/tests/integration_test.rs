use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::models::{PatientError, PatientSearchQuery, RegisterPatientRequest};
use patient_cell::services::patient::PatientService;
use shared_utils::test_utils::TestConfig;

fn patient_json(patient_id: Uuid, uhid: &str) -> serde_json::Value {
    json!({
        "id": patient_id,
        "uhid": uhid,
        "barcode_id": "BARS2025061234",
        "first_name": "Ravi",
        "last_name": "Kumar",
        "date_of_birth": "1990-03-12",
        "gender": "male",
        "blood_group": "O+",
        "phone_number": "9876543210",
        "email": "ravi.kumar@example.com",
        "address": null,
        "allergies": null,
        "medical_history": null,
        "emergency_contact_name": null,
        "emergency_contact_phone": null,
        "is_active": true,
        "created_at": "2025-06-15T10:30:00Z",
        "updated_at": "2025-06-15T10:30:00Z"
    })
}

fn registration_request() -> RegisterPatientRequest {
    RegisterPatientRequest {
        first_name: "Ravi".to_string(),
        last_name: "Kumar".to_string(),
        date_of_birth: "1990-03-12".parse().unwrap(),
        gender: "male".to_string(),
        blood_group: Some("O+".to_string()),
        phone_number: "9876543210".to_string(),
        email: Some("ravi.kumar@example.com".to_string()),
        address: None,
        allergies: None,
        medical_history: None,
        emergency_contact_name: None,
        emergency_contact_phone: None,
        follow_up: None,
    }
}

#[tokio::test]
async fn registration_mints_identifiers_and_inserts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let patient_id = Uuid::new_v4();

    // UHID uniqueness probe finds no collision
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            patient_json(patient_id, "AH25060042")
        ])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let (patient, follow_up) = service
        .register_patient(registration_request(), "test-token")
        .await
        .unwrap();

    assert_eq!(patient.id, patient_id);
    assert_eq!(patient.uhid, "AH25060042");
    assert!(follow_up.is_none());
}

#[tokio::test]
async fn registration_retries_after_uhid_collision() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let patient_id = Uuid::new_v4();

    // First probe hits an existing UHID, the retry finds a free one
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            patient_json(patient_id, "AH25060099")
        ])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let (patient, _) = service
        .register_patient(registration_request(), "test-token")
        .await
        .unwrap();

    assert_eq!(patient.id, patient_id);
}

#[tokio::test]
async fn registration_requires_a_name() {
    let config = TestConfig::default().to_app_config();

    let mut request = registration_request();
    request.first_name = "  ".to_string();

    let service = PatientService::new(&config);
    let result = service.register_patient(request, "test-token").await;

    assert_matches!(result, Err(PatientError::ValidationError(_)));
}

#[tokio::test]
async fn lookup_by_uhid() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("uhid", "eq.AH25060042"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_json(patient_id, "AH25060042")
        ])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let patient = service.get_patient_by_uhid("AH25060042", "test-token").await.unwrap();

    assert_eq!(patient.id, patient_id);
    assert_eq!(patient.full_name(), "Ravi Kumar");
}

#[tokio::test]
async fn lookup_by_barcode() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("barcode_id", "eq.BARS2025061234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_json(patient_id, "AH25060042")
        ])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let patient = service.get_patient_by_barcode("BARS2025061234", "test-token").await.unwrap();

    assert_eq!(patient.barcode_id, "BARS2025061234");
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let result = service.get_patient(Uuid::new_v4(), "test-token").await;

    assert_matches!(result, Err(PatientError::NotFound));
}

#[tokio::test]
async fn search_applies_pagination() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();

    // Page 3 at 10 per page lands at offset 20
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_json(Uuid::new_v4(), "AH25060001")
        ])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let patients = service
        .search_patients(
            PatientSearchQuery {
                search: None,
                is_active: None,
                page: Some(3),
                limit: Some(10),
            },
            "test-token",
        )
        .await
        .unwrap();

    assert_eq!(patients.len(), 1);
}
