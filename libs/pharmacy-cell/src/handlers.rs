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

use crate::models::{AdjustStockRequest, BatchListQuery, CreateBatchRequest, PharmacyError};
use crate::services::inventory::InventoryService;

fn map_pharmacy_error(e: PharmacyError) -> AppError {
    match e {
        PharmacyError::BatchNotFound => AppError::NotFound("Batch not found".to_string()),
        PharmacyError::InsufficientStock(msg) => AppError::Conflict(msg),
        PharmacyError::ValidationError(msg) => AppError::ValidationError(msg),
        PharmacyError::DatabaseError(msg) => {
            AppError::Database(format!("Pharmacy operation failed: {}", msg))
        }
    }
}

#[axum::debug_handler]
pub async fn create_batch(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBatchRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = InventoryService::new(&state);
    let batch = service.create_batch(request, &user.id, token).await
        .map_err(map_pharmacy_error)?;

    Ok(Json(json!({
        "success": true,
        "batch": batch
    })))
}

#[axum::debug_handler]
pub async fn get_batch(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = InventoryService::new(&state);
    let batch = service.get_batch(batch_id, token).await
        .map_err(map_pharmacy_error)?;

    Ok(Json(json!({ "batch": batch })))
}

#[axum::debug_handler]
pub async fn list_batches(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<BatchListQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = InventoryService::new(&state);
    let batches = service.list_batches(query, token).await
        .map_err(map_pharmacy_error)?;

    Ok(Json(json!({
        "count": batches.len(),
        "batches": batches
    })))
}

#[axum::debug_handler]
pub async fn adjust_stock(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(batch_id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = InventoryService::new(&state);
    let batch = service.adjust_stock(batch_id, request, &user.id, token).await
        .map_err(map_pharmacy_error)?;

    Ok(Json(json!({
        "success": true,
        "batch": batch
    })))
}

#[axum::debug_handler]
pub async fn list_transactions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = InventoryService::new(&state);
    let transactions = service.list_transactions(batch_id, token).await
        .map_err(map_pharmacy_error)?;

    Ok(Json(json!({
        "count": transactions.len(),
        "transactions": transactions
    })))
}
