use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};

// ==============================================================================
// CORE PATIENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Unique hospital identifier, `AH{YY}{MM}{rand4}`. Assigned once at
    /// registration, never changed.
    pub uhid: String,
    /// Wristband barcode, `BARS{YYYY}{MM}{4-digit}`. Also immutable.
    pub barcode_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub blood_group: Option<String>,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub blood_group: Option<String>,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    /// When present, registration also tries to book this follow-up visit.
    /// Best-effort: a failure is logged and registration still succeeds.
    pub follow_up: Option<FollowUpRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpRequest {
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSearchQuery {
    /// Substring match over uhid, names and phone number.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Year and month recovered from a wristband barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarcodeInfo {
    pub year: i32,
    pub month: u32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Identifier generation failed: {0}")]
    GenerationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
