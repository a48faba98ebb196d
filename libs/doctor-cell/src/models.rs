use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveTime};

fn default_working_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn default_working_end() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap()
}

/// Monday through Friday, chrono `number_from_monday` numbering.
fn default_working_days() -> Vec<u8> {
    vec![1, 2, 3, 4, 5]
}

fn default_daily_cap() -> i32 {
    20
}

fn default_is_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    /// Human-readable identifier, `DR{YY}{MM}{seq4}`. Generated once at
    /// creation, immutable afterwards.
    pub doctor_number: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub consultation_fee: Option<f64>,
    #[serde(default = "default_working_start")]
    pub working_start: NaiveTime,
    #[serde(default = "default_working_end")]
    pub working_end: NaiveTime,
    #[serde(default = "default_working_days")]
    pub working_days: Vec<u8>,
    #[serde(default = "default_daily_cap")]
    pub max_appointments_per_day: i32,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub consultation_fee: Option<f64>,
    pub working_start: Option<NaiveTime>,
    pub working_end: Option<NaiveTime>,
    pub working_days: Option<Vec<u8>>,
    pub max_appointments_per_day: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub consultation_fee: Option<f64>,
    pub working_start: Option<NaiveTime>,
    pub working_end: Option<NaiveTime>,
    pub working_days: Option<Vec<u8>>,
    pub max_appointments_per_day: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
