use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AdjustStockRequest, BatchListQuery, BatchStatus, CreateBatchRequest, MedicineBatch,
    PharmacyError, StockTransaction, TransactionType,
};

/// Status as derived from the batch's expiry date and remaining quantity.
/// Expiry wins over low stock; the stored column is only a hint and every
/// read path runs this.
pub fn derive_batch_status(expiry_date: NaiveDate, quantity: i32, threshold: i32, today: NaiveDate) -> BatchStatus {
    if expiry_date <= today {
        BatchStatus::Expired
    } else if quantity <= threshold {
        BatchStatus::LowStock
    } else {
        BatchStatus::Active
    }
}

pub struct InventoryService {
    supabase: Arc<SupabaseClient>,
}

impl InventoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Receive a new batch into stock. Writes the batch row and a `received`
    /// stock transaction for the opening quantity.
    pub async fn create_batch(
        &self,
        request: CreateBatchRequest,
        performed_by: &str,
        auth_token: &str,
    ) -> Result<MedicineBatch, PharmacyError> {
        if request.batch_number.trim().is_empty() {
            return Err(PharmacyError::ValidationError("Batch number is required".to_string()));
        }
        if request.quantity < 0 {
            return Err(PharmacyError::ValidationError("Quantity cannot be negative".to_string()));
        }
        if request.expiry_date <= request.manufacturing_date {
            return Err(PharmacyError::ValidationError(
                "Expiry date must be after manufacturing date".to_string(),
            ));
        }

        let now = Utc::now();
        let today = now.date_naive();
        let received_date = request.received_date.unwrap_or(today);
        let threshold = request.low_stock_threshold.unwrap_or(10);
        let status = derive_batch_status(request.expiry_date, request.quantity, threshold, today);

        let batch_data = json!({
            "medicine_id": request.medicine_id,
            "batch_number": request.batch_number,
            "manufacturing_date": request.manufacturing_date.format("%Y-%m-%d").to_string(),
            "expiry_date": request.expiry_date.format("%Y-%m-%d").to_string(),
            "received_date": received_date.format("%Y-%m-%d").to_string(),
            "current_quantity": request.quantity,
            "low_stock_threshold": threshold,
            "unit_cost": request.unit_cost,
            "selling_price": request.selling_price,
            "supplier_id": request.supplier_id,
            "status": status.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/medicine_batches",
            Some(auth_token),
            Some(batch_data),
            Some(headers),
        ).await.map_err(|e| PharmacyError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PharmacyError::DatabaseError("Failed to create batch".to_string()));
        }

        let batch: MedicineBatch = serde_json::from_value(result[0].clone())
            .map_err(|e| PharmacyError::DatabaseError(format!("Failed to parse batch: {}", e)))?;

        self.record_transaction(
            batch.id,
            TransactionType::Received,
            request.quantity,
            performed_by,
            Some(format!("Batch {} received", batch.batch_number)),
            auth_token,
        ).await?;

        info!("Batch {} created with {} units", batch.batch_number, batch.current_quantity);
        Ok(batch)
    }

    pub async fn get_batch(&self, batch_id: Uuid, auth_token: &str) -> Result<MedicineBatch, PharmacyError> {
        let path = format!("/rest/v1/medicine_batches?id=eq.{}", batch_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PharmacyError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PharmacyError::BatchNotFound);
        }

        let mut batch: MedicineBatch = serde_json::from_value(result[0].clone())
            .map_err(|e| PharmacyError::DatabaseError(format!("Failed to parse batch: {}", e)))?;

        batch.status = derive_batch_status(
            batch.expiry_date,
            batch.current_quantity,
            batch.low_stock_threshold,
            Utc::now().date_naive(),
        );
        Ok(batch)
    }

    /// Paginated batch list. The status filter is applied after derivation,
    /// so a batch stored `active` that has since expired filters as expired.
    pub async fn list_batches(
        &self,
        query: BatchListQuery,
        auth_token: &str,
    ) -> Result<Vec<MedicineBatch>, PharmacyError> {
        debug!("Listing batches with filters: {:?}", query);

        let mut query_parts = Vec::new();
        if let Some(medicine_id) = query.medicine_id {
            query_parts.push(format!("medicine_id=eq.{}", medicine_id));
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
            "/rest/v1/medicine_batches?{}order=expiry_date.asc&limit={}&offset={}",
            filters, limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PharmacyError::DatabaseError(e.to_string()))?;

        let today = Utc::now().date_naive();
        let mut batches = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<MedicineBatch>, _>>()
            .map_err(|e| PharmacyError::DatabaseError(format!("Failed to parse batches: {}", e)))?;

        for batch in &mut batches {
            batch.status = derive_batch_status(
                batch.expiry_date,
                batch.current_quantity,
                batch.low_stock_threshold,
                today,
            );
        }

        if let Some(status) = query.status {
            batches.retain(|b| b.status == status);
        }

        Ok(batches)
    }

    /// Move stock out of (or adjust within) a batch. Dispensing more than
    /// the remaining quantity is rejected before any write. The read and the
    /// update are separate statements; concurrent adjustments can interleave.
    pub async fn adjust_stock(
        &self,
        batch_id: Uuid,
        request: AdjustStockRequest,
        performed_by: &str,
        auth_token: &str,
    ) -> Result<MedicineBatch, PharmacyError> {
        if request.quantity <= 0 {
            return Err(PharmacyError::ValidationError("Quantity must be positive".to_string()));
        }
        if request.transaction_type == TransactionType::Received {
            return Err(PharmacyError::ValidationError(
                "Receipts go through batch creation, not adjustment".to_string(),
            ));
        }

        let batch = self.get_batch(batch_id, auth_token).await?;

        let delta = match request.transaction_type {
            TransactionType::Received => request.quantity,
            TransactionType::Adjusted => request.quantity,
            TransactionType::Dispensed | TransactionType::ExpiredWriteoff => -request.quantity,
        };

        let new_quantity = batch.current_quantity + delta;
        if new_quantity < 0 {
            return Err(PharmacyError::InsufficientStock(format!(
                "Batch {} has {} units, cannot remove {}",
                batch.batch_number, batch.current_quantity, request.quantity
            )));
        }

        let today = Utc::now().date_naive();
        let new_status = derive_batch_status(batch.expiry_date, new_quantity, batch.low_stock_threshold, today);

        let update_data = json!({
            "current_quantity": new_quantity,
            "status": new_status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/medicine_batches?id=eq.{}", batch_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| PharmacyError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PharmacyError::BatchNotFound);
        }

        self.record_transaction(
            batch_id,
            request.transaction_type,
            delta,
            performed_by,
            request.note,
            auth_token,
        ).await?;

        let mut updated: MedicineBatch = serde_json::from_value(result[0].clone())
            .map_err(|e| PharmacyError::DatabaseError(format!("Failed to parse batch: {}", e)))?;
        updated.status = derive_batch_status(
            updated.expiry_date,
            updated.current_quantity,
            updated.low_stock_threshold,
            today,
        );

        info!("Batch {} adjusted by {} to {} units", batch_id, delta, updated.current_quantity);
        Ok(updated)
    }

    pub async fn list_transactions(
        &self,
        batch_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<StockTransaction>, PharmacyError> {
        let path = format!(
            "/rest/v1/stock_transactions?batch_id=eq.{}&order=created_at.desc",
            batch_id
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PharmacyError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<StockTransaction>, _>>()
            .map_err(|e| PharmacyError::DatabaseError(format!("Failed to parse transactions: {}", e)))
    }

    async fn record_transaction(
        &self,
        batch_id: Uuid,
        transaction_type: TransactionType,
        quantity: i32,
        performed_by: &str,
        note: Option<String>,
        auth_token: &str,
    ) -> Result<(), PharmacyError> {
        let transaction_data = json!({
            "batch_id": batch_id,
            "transaction_type": transaction_type.to_string(),
            "quantity": quantity,
            "performed_by": performed_by,
            "note": note,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/stock_transactions",
            Some(auth_token),
            Some(transaction_data),
            Some(headers),
        ).await.map_err(|e| PharmacyError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
