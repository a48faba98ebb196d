use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, DoctorError, DoctorSearchQuery, UpdateDoctorRequest};
use crate::services::doctor::DoctorService;

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(format!("Doctor operation failed: {}", msg)),
    }
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Only admins can register doctors
    if user.role.as_deref() != Some("admin") {
        return Err(AppError::Auth("Not authorized to register doctors".to_string()));
    }

    let service = DoctorService::new(&state);
    let doctor = service.create_doctor(request, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = DoctorService::new(&state);
    let doctor = service.get_doctor(doctor_id, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "doctor": doctor })))
}

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = DoctorService::new(&state);
    let doctors = service.search_doctors(query, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "count": doctors.len(),
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_admin = user.role.as_deref() == Some("admin");
    let is_self = user.id == doctor_id.to_string();
    if !is_admin && !is_self {
        return Err(AppError::Auth("Not authorized to update this doctor".to_string()));
    }

    let service = DoctorService::new(&state);
    let doctor = service.update_doctor(doctor_id, request, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}
