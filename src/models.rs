use crate::calculator::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: i64,
    pub user_id: i64,
    pub operation: Operation,
    pub operand1: f64,
    pub operand2: f64,
    pub result: f64,
    pub created_at: DateTime<Utc>,
}

/// A calculation about to be stored
#[derive(Debug, Clone)]
pub struct NewCalculation {
    pub user_id: i64,
    pub operation: Operation,
    pub operand1: f64,
    pub operand2: f64,
    pub result: f64,
}

/// Create request body
#[derive(Debug, Clone, Deserialize)]
pub struct CalculationCreate {
    pub operation: Operation,
    pub operand1: f64,
    pub operand2: f64,
}

/// Update request body, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalculationUpdate {
    pub operation: Option<Operation>,
    pub operand1: Option<f64>,
    pub operand2: Option<f64>,
}

/// Result of a freshly performed calculation
#[derive(Debug, Serialize, Deserialize)]
pub struct CalculationResult {
    pub operation: Operation,
    pub operand1: f64,
    pub operand2: f64,
    pub result: f64,
    pub message: String,
}

/// History query filters
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub operation: Option<Operation>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Raw aggregates for a user's calculations
#[derive(Debug, Clone, Default)]
pub struct CalculationStats {
    pub total: i64,
    pub operation_counts: Vec<(Operation, i64)>,
    pub average_result: Option<f64>,
    pub latest_created_at: Option<DateTime<Utc>>,
}
