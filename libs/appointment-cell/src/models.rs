use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveDateTime, NaiveTime, Duration};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Human-readable identifier, `APT{YYYYMMDD}{seq4}`.
    pub appointment_number: String,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub prescriptions: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn start_time(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time)
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time() + Duration::minutes(self.duration_minutes as i64)
    }

    /// Cancelled rows stay in the table (nothing is ever deleted) but stop
    /// counting toward conflicts and the daily cap.
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    RoutineCheckup,
    Emergency,
    NewPatient,
}

impl Default for AppointmentType {
    fn default() -> Self {
        AppointmentType::Consultation
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::RoutineCheckup => write!(f, "routine_checkup"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::NewPatient => write!(f, "new_patient"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking input as submitted by the scheduling form. Identity and timing
/// fields stay optional so that "required field" failures surface through the
/// validator as readable errors rather than as deserialization rejects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub symptoms: Option<String>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
    pub new_duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub symptoms: Option<String>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub prescriptions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<AppointmentType>,
    pub search: Option<String>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

// ==============================================================================
// JOINED READ MODELS
// ==============================================================================

/// Appointment row with patient/doctor display fields embedded via PostgREST
/// resource embedding (`select=*,patients(...),doctors(...)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patients: Option<PatientRef>,
    pub doctors: Option<DoctorRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRef {
    pub uhid: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRef {
    pub doctor_number: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
}

// ==============================================================================
// VALIDATION AND SUGGESTION MODELS
// ==============================================================================

/// Booking policy passed explicitly into every validator call. Immutable
/// configuration, not module state.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub min_advance_booking_hours: i64,
    pub max_advance_booking_days: i64,
    pub business_day_start_hour: u32,
    pub business_day_end_hour: u32,
    pub allow_weekend_booking: bool,
    pub default_duration_minutes: i32,
    pub min_appointment_duration: i32,
    pub max_appointment_duration: i32,
    pub max_appointments_per_day: usize,
    pub slot_interval_minutes: i64,
    pub suggestion_window_days: i64,
    pub max_suggestions: usize,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_advance_booking_hours: 2,
            max_advance_booking_days: 90,
            business_day_start_hour: 9,
            business_day_end_hour: 18,
            allow_weekend_booking: false,
            default_duration_minutes: 30,
            min_appointment_duration: 15,
            max_appointment_duration: 120,
            max_appointments_per_day: 20,
            slot_interval_minutes: 30,
            suggestion_window_days: 7,
            max_suggestions: 5,
        }
    }
}

/// Validation result returned as data so the caller can render every issue
/// at once. Warnings never affect validity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotSuggestion {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialization: String,
}

/// Outcome of a booking or reschedule attempt. Policy violations come back
/// as data, not errors, so the UI can render the full list plus alternatives.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    Booked(Box<Appointment>),
    Rejected {
        outcome: ValidationOutcome,
        suggestions: Vec<SlotSuggestion>,
    },
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
