use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};

use doctor_cell::models::Doctor;

use crate::models::{Appointment, BookingPolicy, ScheduleAppointmentRequest, SlotSuggestion};
use crate::services::validation::{intervals_overlap, validate_basic};

/// Scan a window of days after the requested date for open slots on the
/// requested doctor's calendar.
///
/// Day offsets run 0..window in order; within a day, candidates advance
/// across business hours at the slot interval. The first `max_suggestions`
/// survivors are returned, so ordering is date-then-time (first found, not
/// globally optimal) and the result is stable for unchanged backing data.
pub fn find_alternative_slots(
    policy: &BookingPolicy,
    request: &ScheduleAppointmentRequest,
    doctor: &Doctor,
    existing: &[Appointment],
    now: DateTime<Utc>,
    max_suggestions: usize,
) -> Vec<SlotSuggestion> {
    let mut suggestions = Vec::new();

    let from_date = match request.appointment_date {
        Some(date) => date,
        None => return suggestions,
    };
    let duration = request.duration_minutes.unwrap_or(policy.default_duration_minutes);

    for day_offset in 0..policy.suggestion_window_days {
        let date = from_date + Duration::days(day_offset);

        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !policy.allow_weekend_booking {
            continue;
        }

        let day_appointments: Vec<&Appointment> = existing.iter()
            .filter(|a| a.appointment_date == date && !a.is_cancelled())
            .collect();

        let mut minute_of_day = policy.business_day_start_hour as i64 * 60;
        let day_end = policy.business_day_end_hour as i64 * 60;

        while minute_of_day < day_end {
            let time = NaiveTime::from_hms_opt(
                (minute_of_day / 60) as u32,
                (minute_of_day % 60) as u32,
                0,
            ).unwrap();
            minute_of_day += policy.slot_interval_minutes;

            let start = date.and_time(time);
            let end = start + Duration::minutes(duration as i64);

            if day_appointments.iter()
                .any(|a| intervals_overlap(start, end, a.start_time(), a.end_time()))
            {
                continue;
            }

            // Candidates still have to clear the basic policy checks
            // (lead time, business hours, duration bounds).
            let candidate = ScheduleAppointmentRequest {
                appointment_date: Some(date),
                appointment_time: Some(time),
                ..request.clone()
            };
            if !validate_basic(policy, &candidate, now).valid {
                continue;
            }

            suggestions.push(SlotSuggestion {
                date,
                time,
                doctor_id: doctor.id,
                doctor_name: doctor.full_name(),
                specialization: doctor.specialization.clone(),
            });

            if suggestions.len() >= max_suggestions {
                return suggestions;
            }
        }
    }

    suggestions
}
