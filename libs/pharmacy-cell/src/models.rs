use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

// ==============================================================================
// INVENTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineBatch {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub batch_number: String,
    pub manufacturing_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub received_date: NaiveDate,
    pub current_quantity: i32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
    pub unit_cost: f64,
    pub selling_price: f64,
    pub supplier_id: Option<Uuid>,
    /// Stored status is a hint; reads re-derive it from expiry and quantity.
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_low_stock_threshold() -> i32 {
    10
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    Expired,
    LowStock,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Active => write!(f, "active"),
            BatchStatus::Expired => write!(f, "expired"),
            BatchStatus::LowStock => write!(f, "low_stock"),
        }
    }
}

/// Audit row written for every stock movement. Quantity is a signed delta;
/// receipts are positive, dispenses negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub performed_by: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Received,
    Dispensed,
    Adjusted,
    ExpiredWriteoff,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Received => write!(f, "received"),
            TransactionType::Dispensed => write!(f, "dispensed"),
            TransactionType::Adjusted => write!(f, "adjusted"),
            TransactionType::ExpiredWriteoff => write!(f, "expired_writeoff"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBatchRequest {
    pub medicine_id: Uuid,
    pub batch_number: String,
    pub manufacturing_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub received_date: Option<NaiveDate>,
    pub quantity: i32,
    pub low_stock_threshold: Option<i32>,
    pub unit_cost: f64,
    pub selling_price: f64,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStockRequest {
    pub transaction_type: TransactionType,
    /// Units moved, always positive; direction comes from the type.
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchListQuery {
    pub medicine_id: Option<Uuid>,
    pub status: Option<BatchStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PharmacyError {
    #[error("Batch not found")]
    BatchNotFound,

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
