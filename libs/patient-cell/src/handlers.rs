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
    PatientError, PatientSearchQuery, RegisterPatientRequest, UpdatePatientRequest,
};
use crate::services::identifiers::extract_barcode_info;
use crate::services::patient::PatientService;

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::GenerationError(msg) => {
            AppError::Internal(format!("Identifier generation failed: {}", msg))
        }
        PatientError::DatabaseError(msg) => {
            AppError::Database(format!("Patient operation failed: {}", msg))
        }
    }
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PatientService::new(&state);
    let (patient, follow_up) = service.register_patient(request, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "follow_up_appointment": follow_up
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PatientService::new(&state);
    let patient = service.get_patient(patient_id, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({ "patient": patient })))
}

#[axum::debug_handler]
pub async fn get_patient_by_uhid(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(uhid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PatientService::new(&state);
    let patient = service.get_patient_by_uhid(&uhid, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({ "patient": patient })))
}

#[axum::debug_handler]
pub async fn get_patient_by_barcode(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(barcode_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PatientService::new(&state);
    let patient = service.get_patient_by_barcode(&barcode_id, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "patient": patient,
        "barcode_info": extract_barcode_info(&barcode_id)
    })))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PatientService::new(&state);
    let patients = service.search_patients(query, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "count": patients.len(),
        "patients": patients
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PatientService::new(&state);
    let patient = service.update_patient(patient_id, request, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}
