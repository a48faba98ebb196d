use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use uuid::Uuid;

use crate::models::{Appointment, BookingPolicy, ScheduleAppointmentRequest, ValidationOutcome};

/// Substrings that mark a rejection as schedule-related. Only these trigger
/// the alternative-slot search; anything else (weekend, lead time, duration)
/// is a policy problem no other slot can fix.
pub const CONFLICT_FRAGMENT: &str = "conflicting appointment";
pub const DAILY_LIMIT_FRAGMENT: &str = "maximum daily appointment limit";

/// Interval overlap test for `[s1,e1)` against `[s2,e2)`.
///
/// Kept as the three explicit branches of the original scheduler: new start
/// falls inside existing, new end falls inside existing, or new fully
/// contains existing. Equivalent to `s1 < e2 && s2 < e1`; back-to-back
/// intervals (`e1 == s2` or `e2 == s1`) do not conflict.
pub fn intervals_overlap(s1: NaiveDateTime, e1: NaiveDateTime, s2: NaiveDateTime, e2: NaiveDateTime) -> bool {
    let new_start_inside = s1 >= s2 && s1 < e2;
    let new_end_inside = e1 > s2 && e1 <= e2;
    let new_contains_existing = s1 <= s2 && e1 >= e2;

    new_start_inside || new_end_inside || new_contains_existing
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Field and policy checks that need no backing data. The slot finder
/// re-runs this on every candidate.
pub fn validate_basic(
    policy: &BookingPolicy,
    request: &ScheduleAppointmentRequest,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if request.patient_id.is_none() {
        errors.push("Patient is required".to_string());
    }
    if request.doctor_id.is_none() {
        errors.push("Doctor is required".to_string());
    }
    if request.appointment_date.is_none() {
        errors.push("Appointment date is required".to_string());
    }
    if request.appointment_time.is_none() {
        errors.push("Appointment time is required".to_string());
    }
    if !errors.is_empty() {
        return ValidationOutcome::from_parts(errors, warnings);
    }

    let date = request.appointment_date.unwrap();
    let time = request.appointment_time.unwrap();
    let start = date.and_time(time).and_utc();

    if start <= now {
        errors.push("Appointment must be scheduled in the future".to_string());
    }

    let min_lead = Duration::hours(policy.min_advance_booking_hours);
    if start > now && start < now + min_lead {
        errors.push(format!(
            "Appointments must be booked at least {} hours in advance",
            policy.min_advance_booking_hours
        ));
    }

    let max_lead = Duration::days(policy.max_advance_booking_days);
    if start > now + max_lead {
        errors.push(format!(
            "Appointments cannot be booked more than {} days in advance",
            policy.max_advance_booking_days
        ));
    }

    if is_weekend(date.weekday()) && !policy.allow_weekend_booking {
        errors.push("Appointments cannot be booked on weekends".to_string());
    }

    // The hour gate applies to the start time only. A long appointment
    // starting before closing is accepted even if it runs past it; that
    // case gets a warning below, never an error.
    let hour = time.hour();
    if hour < policy.business_day_start_hour || hour >= policy.business_day_end_hour {
        errors.push(format!(
            "Appointments must start within business hours ({}:00-{}:00)",
            policy.business_day_start_hour, policy.business_day_end_hour
        ));
    }

    if let Some(duration) = request.duration_minutes {
        if duration < policy.min_appointment_duration || duration > policy.max_appointment_duration {
            errors.push(format!(
                "Appointment duration must be between {} and {} minutes",
                policy.min_appointment_duration, policy.max_appointment_duration
            ));
        }
    }

    if errors.is_empty() {
        let duration = request.duration_minutes.unwrap_or(policy.default_duration_minutes);
        let end = date.and_time(time) + Duration::minutes(duration as i64);
        let closing = NaiveTime::from_hms_opt(policy.business_day_end_hour, 0, 0).unwrap();
        if end.date() > date || end.time() > closing {
            warnings.push(format!(
                "Appointment runs past closing time ({}:00)",
                policy.business_day_end_hour
            ));
        }
    }

    ValidationOutcome::from_parts(errors, warnings)
}

/// Full conflict validation: basic checks, then interval overlap on the
/// doctor and patient axes, then the doctor's daily cap. The appointment
/// slices must be same-date rows; cancelled rows and the excluded
/// appointment (reschedule) are filtered here. Read-only; the caller's
/// check-then-insert sequence is not transactionally isolated and two
/// concurrent requests can both pass.
pub fn validate_schedule(
    policy: &BookingPolicy,
    request: &ScheduleAppointmentRequest,
    doctor_appointments: &[Appointment],
    patient_appointments: &[Appointment],
    doctor_daily_cap: usize,
    exclude_appointment_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    let basic = validate_basic(policy, request, now);
    if !basic.valid {
        return basic;
    }

    let mut errors = Vec::new();
    let warnings = basic.warnings;

    let date = request.appointment_date.unwrap();
    let time = request.appointment_time.unwrap();
    let duration = request.duration_minutes.unwrap_or(policy.default_duration_minutes);
    let start = date.and_time(time);
    let end = start + Duration::minutes(duration as i64);

    let counts = |appointment: &&Appointment| -> bool {
        !appointment.is_cancelled()
            && appointment.appointment_date == date
            && Some(appointment.id) != exclude_appointment_id
    };

    let doctor_active: Vec<&Appointment> = doctor_appointments.iter().filter(counts).collect();
    let patient_active: Vec<&Appointment> = patient_appointments.iter().filter(counts).collect();

    if doctor_active.iter().any(|a| intervals_overlap(start, end, a.start_time(), a.end_time())) {
        errors.push("The doctor has a conflicting appointment at the requested time".to_string());
    }

    if patient_active.iter().any(|a| intervals_overlap(start, end, a.start_time(), a.end_time())) {
        errors.push("The patient has a conflicting appointment at the requested time".to_string());
    }

    if doctor_active.len() >= doctor_daily_cap {
        errors.push(format!(
            "Doctor has reached the maximum daily appointment limit of {}",
            doctor_daily_cap
        ));
    }

    ValidationOutcome::from_parts(errors, warnings)
}

/// Whether a failed validation should trigger the alternative-slot search.
pub fn should_offer_alternatives(outcome: &ValidationOutcome) -> bool {
    outcome.errors.iter().any(|e| {
        e.contains(CONFLICT_FRAGMENT) || e.contains(DAILY_LIMIT_FRAGMENT)
    })
}
