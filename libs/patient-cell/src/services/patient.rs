use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use appointment_cell::models::{
    Appointment, AppointmentType, BookingOutcome, ScheduleAppointmentRequest,
};
use appointment_cell::services::booking::AppointmentBookingService;

use crate::models::{
    Patient, PatientError, PatientSearchQuery, RegisterPatientRequest, UpdatePatientRequest,
};
use crate::services::identifiers::{generate_barcode_id, generate_uhid};

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
    booking: AppointmentBookingService,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            booking: AppointmentBookingService::new(config),
        }
    }

    /// Register a new patient: mint UHID and barcode, insert, then try the
    /// optional follow-up booking. The follow-up is best-effort; a failure
    /// there never rolls back the registration.
    pub async fn register_patient(
        &self,
        request: RegisterPatientRequest,
        auth_token: &str,
    ) -> Result<(Patient, Option<Appointment>), PatientError> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(PatientError::ValidationError("Patient name is required".to_string()));
        }
        if request.phone_number.trim().is_empty() {
            return Err(PatientError::ValidationError("Phone number is required".to_string()));
        }

        let now = Utc::now();
        let uhid = generate_uhid(&self.supabase, auth_token, now).await?;
        let barcode_id = generate_barcode_id(now);

        let patient_data = json!({
            "uhid": uhid,
            "barcode_id": barcode_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": request.gender,
            "blood_group": request.blood_group,
            "phone_number": request.phone_number,
            "email": request.email,
            "address": request.address,
            "allergies": request.allergies,
            "medical_history": request.medical_history,
            "emergency_contact_name": request.emergency_contact_name,
            "emergency_contact_phone": request.emergency_contact_phone,
            "is_active": true,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(headers),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::DatabaseError("Failed to create patient".to_string()));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))?;

        info!("Registered patient {} with UHID {}", patient.id, patient.uhid);

        let follow_up = match request.follow_up {
            Some(follow_up) => {
                self.try_book_follow_up(patient.id, follow_up, auth_token).await
            }
            None => None,
        };

        Ok((patient, follow_up))
    }

    async fn try_book_follow_up(
        &self,
        patient_id: Uuid,
        follow_up: crate::models::FollowUpRequest,
        auth_token: &str,
    ) -> Option<Appointment> {
        let booking_request = ScheduleAppointmentRequest {
            patient_id: Some(patient_id),
            doctor_id: Some(follow_up.doctor_id),
            appointment_date: Some(follow_up.appointment_date),
            appointment_time: Some(follow_up.appointment_time),
            duration_minutes: follow_up.duration_minutes,
            appointment_type: AppointmentType::FollowUp,
            symptoms: None,
            chief_complaint: None,
            notes: follow_up.notes,
        };

        match self.booking.schedule_appointment(booking_request, auth_token).await {
            Ok(BookingOutcome::Booked(appointment)) => {
                info!("Follow-up appointment {} booked for patient {}",
                      appointment.appointment_number, patient_id);
                Some(*appointment)
            }
            Ok(BookingOutcome::Rejected { outcome, .. }) => {
                warn!("Follow-up booking for patient {} rejected: {:?}", patient_id, outcome.errors);
                None
            }
            Err(e) => {
                warn!("Follow-up booking for patient {} failed: {}", patient_id, e);
                None
            }
        }
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.fetch_one(&path, auth_token).await
    }

    pub async fn get_patient_by_uhid(&self, uhid: &str, auth_token: &str) -> Result<Patient, PatientError> {
        let encoded = urlencoding::encode(uhid);
        let path = format!("/rest/v1/patients?uhid=eq.{}", encoded);
        self.fetch_one(&path, auth_token).await
    }

    pub async fn get_patient_by_barcode(&self, barcode_id: &str, auth_token: &str) -> Result<Patient, PatientError> {
        let encoded = urlencoding::encode(barcode_id);
        let path = format!("/rest/v1/patients?barcode_id=eq.{}", encoded);
        self.fetch_one(&path, auth_token).await
    }

    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(is_active) = query.is_active {
            query_parts.push(format!("is_active=eq.{}", is_active));
        }
        if let Some(search) = query.search {
            let encoded = urlencoding::encode(&search).into_owned();
            query_parts.push(format!(
                "or=(uhid.ilike.%{}%,first_name.ilike.%{}%,last_name.ilike.%{}%,phone_number.ilike.%{}%)",
                encoded, encoded, encoded, encoded
            ));
        }

        let limit = query.limit.unwrap_or(50).max(1);
        let page = query.page.unwrap_or(1).max(1);
        let offset = (page - 1) * limit;

        let filters = if query_parts.is_empty() {
            String::new()
        } else {
            format!("{}&", query_parts.join("&"))
        };

        let path = format!(
            "/rest/v1/patients?{}order=created_at.desc&limit={}&offset={}",
            filters, limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patients: {}", e)))
    }

    /// Field-subset PATCH. UHID and barcode are deliberately not updatable.
    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient: {}", patient_id);

        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(blood_group) = request.blood_group {
            update_data.insert("blood_group".to_string(), json!(blood_group));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(allergies) = request.allergies {
            update_data.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(medical_history) = request.medical_history {
            update_data.insert("medical_history".to_string(), json!(medical_history));
        }
        if let Some(emergency_contact_name) = request.emergency_contact_name {
            update_data.insert("emergency_contact_name".to_string(), json!(emergency_contact_name));
        }
        if let Some(emergency_contact_phone) = request.emergency_contact_phone {
            update_data.insert("emergency_contact_phone".to_string(), json!(emergency_contact_phone));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse updated patient: {}", e)))
    }

    async fn fetch_one(&self, path: &str, auth_token: &str) -> Result<Patient, PatientError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }
}
