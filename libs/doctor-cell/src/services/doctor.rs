use chrono::{Datelike, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, DoctorSearchQuery, UpdateDoctorRequest};

/// Format a doctor number for a given month and sequence position:
/// `DR{YY}{MM}{seq4}`.
pub fn format_doctor_number(date: NaiveDate, seq: usize) -> String {
    format!("DR{:02}{:02}{:04}", date.year() % 100, date.month(), seq)
}

pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor profile for {} {}", request.first_name, request.last_name);

        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(DoctorError::ValidationError("Doctor name is required".to_string()));
        }
        if request.specialization.trim().is_empty() {
            return Err(DoctorError::ValidationError("Specialization is required".to_string()));
        }

        let doctor_number = self.generate_doctor_number(auth_token).await?;
        let now = Utc::now();

        let doctor_data = json!({
            "doctor_number": doctor_number,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "specialization": request.specialization,
            "email": request.email,
            "phone_number": request.phone_number,
            "consultation_fee": request.consultation_fee,
            "working_start": request.working_start
                .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
                .format("%H:%M:%S").to_string(),
            "working_end": request.working_end
                .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap())
                .format("%H:%M:%S").to_string(),
            "working_days": request.working_days.unwrap_or_else(|| vec![1, 2, 3, 4, 5]),
            "max_appointments_per_day": request.max_appointments_per_day.unwrap_or(20),
            "is_active": true,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(auth_token),
            Some(doctor_data),
            Some(headers),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError("Failed to create doctor profile".to_string()));
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        debug!("Doctor {} created with number {}", doctor.id, doctor.doctor_number);
        Ok(doctor)
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    pub async fn search_doctors(
        &self,
        query: DoctorSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Searching doctors with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(specialization) = query.specialization {
            query_parts.push(format!("specialization=ilike.%{}%", specialization));
        }
        if let Some(search) = query.search {
            query_parts.push(format!(
                "or=(first_name.ilike.%{}%,last_name.ilike.%{}%,doctor_number.ilike.%{}%)",
                search, search, search
            ));
        }
        if let Some(is_active) = query.is_active {
            query_parts.push(format!("is_active=eq.{}", is_active));
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
            "/rest/v1/doctors?{}order=doctor_number.asc&limit={}&offset={}",
            filters, limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor profile: {}", doctor_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(consultation_fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(consultation_fee));
        }
        if let Some(working_start) = request.working_start {
            update_data.insert("working_start".to_string(), json!(working_start.format("%H:%M:%S").to_string()));
        }
        if let Some(working_end) = request.working_end {
            update_data.insert("working_end".to_string(), json!(working_end.format("%H:%M:%S").to_string()));
        }
        if let Some(working_days) = request.working_days {
            update_data.insert("working_days".to_string(), json!(working_days));
        }
        if let Some(cap) = request.max_appointments_per_day {
            update_data.insert("max_appointments_per_day".to_string(), json!(cap));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    /// Sequential doctor number scoped to the current year/month. Count rows
    /// matching the month prefix and append count+1. Not safe against
    /// concurrent creation of the same sequence number; single-admin
    /// registration flows accept that race.
    async fn generate_doctor_number(&self, auth_token: &str) -> Result<String, DoctorError> {
        let today = Utc::now().date_naive();
        let prefix = format!("DR{:02}{:02}", today.year() % 100, today.month());

        let existing = self.supabase.count_rows(
            "doctors",
            &format!("doctor_number=like.{}*", prefix),
            auth_token,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(format_doctor_number(today, existing + 1))
    }
}
