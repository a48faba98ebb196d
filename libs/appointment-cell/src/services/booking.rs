use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use doctor_cell::models::Doctor;

use crate::models::{
    Appointment, AppointmentDetail, AppointmentError, AppointmentSearchQuery,
    AppointmentStatus, BookingOutcome, BookingPolicy, CancelAppointmentRequest,
    RescheduleAppointmentRequest, ScheduleAppointmentRequest, SlotSuggestion,
    UpdateAppointmentRequest,
};
use crate::services::slots::find_alternative_slots;
use crate::services::validation::{should_offer_alternatives, validate_basic, validate_schedule};

/// Format an appointment number for a given day and sequence position:
/// `APT{YYYYMMDD}{seq4}`.
pub fn format_appointment_number(date: NaiveDate, seq: usize) -> String {
    format!("APT{}{:04}", date.format("%Y%m%d"), seq)
}

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    policy: BookingPolicy,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_policy(config, BookingPolicy::default())
    }

    pub fn with_policy(config: &AppConfig, policy: BookingPolicy) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Book a new appointment. Policy violations come back as
    /// `BookingOutcome::Rejected` with the full error list and, for
    /// schedule-related failures, alternative slots. The validation queries
    /// and the insert are separate statements; two concurrent requests can
    /// both pass and double-book. Accepted gap.
    pub async fn schedule_appointment(
        &self,
        request: ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingOutcome, AppointmentError> {
        info!("Scheduling appointment for patient {:?} with doctor {:?}",
              request.patient_id, request.doctor_id);

        let now = Utc::now();

        let basic = validate_basic(&self.policy, &request, now);
        if !basic.valid {
            return Ok(BookingOutcome::Rejected { outcome: basic, suggestions: vec![] });
        }

        // Field checks passed, so these are present.
        let patient_id = request.patient_id.unwrap();
        let doctor_id = request.doctor_id.unwrap();
        let date = request.appointment_date.unwrap();

        let doctor = self.fetch_doctor(doctor_id, auth_token).await?;
        self.verify_patient_exists(patient_id, auth_token).await?;

        let doctor_appointments = self
            .appointments_on_date("doctor_id", doctor_id, date, auth_token)
            .await?;
        let patient_appointments = self
            .appointments_on_date("patient_id", patient_id, date, auth_token)
            .await?;

        let outcome = validate_schedule(
            &self.policy,
            &request,
            &doctor_appointments,
            &patient_appointments,
            doctor.max_appointments_per_day.max(0) as usize,
            None,
            now,
        );

        if !outcome.valid {
            warn!("Booking rejected for doctor {}: {:?}", doctor_id, outcome.errors);
            let suggestions = self
                .maybe_suggest_alternatives(&outcome, &request, &doctor, auth_token, now)
                .await;
            return Ok(BookingOutcome::Rejected { outcome, suggestions });
        }

        let appointment_number = self.generate_appointment_number(auth_token).await?;
        let appointment = self
            .create_appointment_record(appointment_number, &request, auth_token)
            .await?;

        info!("Appointment {} booked with doctor {}", appointment.appointment_number, doctor_id);
        Ok(BookingOutcome::Booked(Box::new(appointment)))
    }

    /// Reschedule an existing appointment. Re-validates the new slot with
    /// the appointment itself excluded from the conflict sets, then flips
    /// status to `rescheduled`.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingOutcome, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        match current.status {
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => {
                return Err(AppointmentError::InvalidStatusTransition(current.status));
            }
            _ => {}
        }

        let now = Utc::now();
        let candidate = ScheduleAppointmentRequest {
            patient_id: Some(current.patient_id),
            doctor_id: Some(current.doctor_id),
            appointment_date: Some(request.new_date),
            appointment_time: Some(request.new_time),
            duration_minutes: Some(request.new_duration_minutes.unwrap_or(current.duration_minutes)),
            appointment_type: current.appointment_type.clone(),
            symptoms: None,
            chief_complaint: None,
            notes: None,
        };

        let doctor = self.fetch_doctor(current.doctor_id, auth_token).await?;
        let doctor_appointments = self
            .appointments_on_date("doctor_id", current.doctor_id, request.new_date, auth_token)
            .await?;
        let patient_appointments = self
            .appointments_on_date("patient_id", current.patient_id, request.new_date, auth_token)
            .await?;

        let outcome = validate_schedule(
            &self.policy,
            &candidate,
            &doctor_appointments,
            &patient_appointments,
            doctor.max_appointments_per_day.max(0) as usize,
            Some(appointment_id),
            now,
        );

        if !outcome.valid {
            let suggestions = self
                .maybe_suggest_alternatives(&outcome, &candidate, &doctor, auth_token, now)
                .await;
            return Ok(BookingOutcome::Rejected { outcome, suggestions });
        }

        let mut update_data = serde_json::Map::new();
        update_data.insert("appointment_date".to_string(), json!(request.new_date.format("%Y-%m-%d").to_string()));
        update_data.insert("appointment_time".to_string(), json!(request.new_time.format("%H:%M:%S").to_string()));
        if let Some(duration) = request.new_duration_minutes {
            update_data.insert("duration_minutes".to_string(), json!(duration));
        }
        update_data.insert("status".to_string(), json!(AppointmentStatus::Rescheduled.to_string()));
        if let Some(reason) = request.reason {
            update_data.insert("notes".to_string(), json!(format!("Rescheduled: {}", reason)));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await?;
        info!("Appointment {} rescheduled to {} {}", appointment_id, request.new_date, request.new_time);
        Ok(BookingOutcome::Booked(Box::new(updated)))
    }

    /// Cancel an appointment. A status flip, never a delete; the row keeps
    /// its history but stops counting toward conflicts and the daily cap.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        match current.status {
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => {
                return Err(AppointmentError::InvalidStatusTransition(current.status));
            }
            _ => {}
        }

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(AppointmentStatus::Cancelled.to_string()));
        if let Some(reason) = request.reason {
            update_data.insert("notes".to_string(), json!(format!("Cancelled: {}", reason)));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let cancelled = self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await?;
        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    /// Field-subset update (status, clinical notes, prescriptions).
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        // Ensure it exists before patching so a bad id surfaces as NotFound.
        let _current = self.get_appointment(appointment_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status.to_string()));
        }
        if let Some(symptoms) = request.symptoms {
            update_data.insert("symptoms".to_string(), json!(symptoms));
        }
        if let Some(chief_complaint) = request.chief_complaint {
            update_data.insert("chief_complaint".to_string(), json!(chief_complaint));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(prescriptions) = request.prescriptions {
            update_data.insert("prescriptions".to_string(), prescriptions);
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// Point read with embedded patient/doctor display fields.
    pub async fn get_appointment_detail(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentDetail, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select=*,patients(uhid,first_name,last_name),doctors(doctor_number,first_name,last_name,specialization)",
            appointment_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment detail: {}", e)))
    }

    /// Filtered, paginated list with embedded display fields.
    /// `offset = (page - 1) * limit`.
    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(date) = query.appointment_date {
            query_parts.push(format!("appointment_date=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(appointment_type) = query.appointment_type {
            query_parts.push(format!("appointment_type=eq.{}", appointment_type));
        }
        if let Some(search) = query.search {
            let encoded = urlencoding::encode(&search).into_owned();
            query_parts.push(format!(
                "or=(appointment_number.ilike.%{}%,symptoms.ilike.%{}%,chief_complaint.ilike.%{}%)",
                encoded, encoded, encoded
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
            "/rest/v1/appointments?{}select=*,patients(uhid,first_name,last_name),doctors(doctor_number,first_name,last_name,specialization)&order=appointment_date.desc,appointment_time.desc&limit={}&offset={}",
            filters, limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AppointmentDetail>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    /// Run the alternative-slot search for a rejected request, if the
    /// rejection is one a different slot can fix. Suggestion failures are
    /// swallowed; the rejection itself is still reported.
    async fn maybe_suggest_alternatives(
        &self,
        outcome: &crate::models::ValidationOutcome,
        request: &ScheduleAppointmentRequest,
        doctor: &Doctor,
        auth_token: &str,
        now: chrono::DateTime<Utc>,
    ) -> Vec<SlotSuggestion> {
        if !should_offer_alternatives(outcome) {
            return vec![];
        }

        match self.fetch_window_appointments(doctor.id, request, auth_token).await {
            Ok(existing) => find_alternative_slots(
                &self.policy,
                request,
                doctor,
                &existing,
                now,
                self.policy.max_suggestions,
            ),
            Err(e) => {
                warn!("Alternative slot search failed: {}", e);
                vec![]
            }
        }
    }

    /// Doctor's non-cancelled appointments across the suggestion window.
    async fn fetch_window_appointments(
        &self,
        doctor_id: Uuid,
        request: &ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let from = match request.appointment_date {
            Some(date) => date,
            None => return Ok(vec![]),
        };
        let to = from + Duration::days(self.policy.suggestion_window_days - 1);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=gte.{}&appointment_date=lte.{}&status=neq.cancelled&order=appointment_date.asc,appointment_time.asc",
            doctor_id,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn appointments_on_date(
        &self,
        axis: &str,
        id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&appointment_date=eq.{}&order=appointment_time.asc",
            axis, id, date.format("%Y-%m-%d")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn fetch_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, AppointmentError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DoctorNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    async fn verify_patient_exists(&self, patient_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::PatientNotFound);
        }

        Ok(())
    }

    /// Sequential appointment number scoped to today: count rows matching
    /// the day prefix, append count+1 zero-padded. Not retry-safe under
    /// concurrent creation; collisions are an accepted limitation.
    async fn generate_appointment_number(&self, auth_token: &str) -> Result<String, AppointmentError> {
        let today = Utc::now().date_naive();
        let prefix = format!("APT{}", today.format("%Y%m%d"));

        let existing = self.supabase.count_rows(
            "appointments",
            &format!("appointment_number=like.{}*", prefix),
            auth_token,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(format_appointment_number(today, existing + 1))
    }

    async fn create_appointment_record(
        &self,
        appointment_number: String,
        request: &ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let duration = request.duration_minutes.unwrap_or(self.policy.default_duration_minutes);

        let appointment_data = json!({
            "appointment_number": appointment_number,
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date.unwrap().format("%Y-%m-%d").to_string(),
            "appointment_time": request.appointment_time.unwrap().format("%H:%M:%S").to_string(),
            "duration_minutes": duration,
            "appointment_type": request.appointment_type.to_string(),
            "status": AppointmentStatus::Scheduled.to_string(),
            "symptoms": request.symptoms,
            "chief_complaint": request.chief_complaint,
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError("Failed to create appointment".to_string()));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e)))
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e)))
    }
}
