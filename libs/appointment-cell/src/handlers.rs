use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, BookingOutcome, CancelAppointmentRequest,
    RescheduleAppointmentRequest, ScheduleAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::InvalidStatusTransition(status) => {
            AppError::Conflict(format!("Appointment cannot be modified in status '{}'", status))
        }
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::DatabaseError(msg) => {
            AppError::Database(format!("Appointment operation failed: {}", msg))
        }
    }
}

fn booking_outcome_response(outcome: BookingOutcome) -> Json<Value> {
    match outcome {
        BookingOutcome::Booked(appointment) => Json(json!({
            "success": true,
            "appointment": appointment
        })),
        BookingOutcome::Rejected { outcome, suggestions } => Json(json!({
            "success": false,
            "errors": outcome.errors,
            "warnings": outcome.warnings,
            "suggested_slots": suggestions
        })),
    }
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AppointmentBookingService::new(&state);
    let outcome = service.schedule_appointment(request, token).await
        .map_err(map_appointment_error)?;

    Ok(booking_outcome_response(outcome))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AppointmentBookingService::new(&state);
    let appointment = service.get_appointment_detail(appointment_id, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AppointmentBookingService::new(&state);
    let appointments = service.search_appointments(query, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AppointmentBookingService::new(&state);
    let appointment = service.update_appointment(appointment_id, request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AppointmentBookingService::new(&state);
    let outcome = service.reschedule_appointment(appointment_id, request, token).await
        .map_err(map_appointment_error)?;

    Ok(booking_outcome_response(outcome))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AppointmentBookingService::new(&state);
    let appointment = service.cancel_appointment(appointment_id, request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}
