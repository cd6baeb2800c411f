//! Calculation CRUD endpoints, scoped to the caller's own history.

use crate::api::{ApiError, AppState};
use crate::auth::middleware::CurrentUser;
use crate::calculator::{calculate, CalcError};
use crate::models::{
    Calculation, CalculationCreate, CalculationResult, CalculationUpdate, NewCalculation,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Calculation not found".to_string())
}

/// POST /calculations
pub async fn create_calculation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<CalculationCreate>, ApiError>,
) -> Result<(StatusCode, Json<CalculationResult>), ApiError> {
    let result = calculate(payload.operation, payload.operand1, payload.operand2)?;

    let calc = state
        .calculations
        .insert(NewCalculation {
            user_id: user.id,
            operation: payload.operation,
            operand1: payload.operand1,
            operand2: payload.operand2,
            result,
        })
        .await?;

    debug!(
        user = %user.username,
        id = calc.id,
        operation = %calc.operation,
        "Calculation stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(CalculationResult {
            operation: calc.operation,
            operand1: calc.operand1,
            operand2: calc.operand2,
            result: calc.result,
            message: "Calculation completed and saved successfully".to_string(),
        }),
    ))
}

/// GET /calculations
pub async fn list_calculations(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Query(params), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<Vec<Calculation>>, ApiError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0);
    let calcs = state.calculations.list(user.id, skip, limit).await?;
    Ok(Json(calcs))
}

/// GET /calculations/:id
pub async fn get_calculation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Calculation>, ApiError> {
    state
        .calculations
        .get(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT /calculations/:id - merge the given fields and recompute
pub async fn update_calculation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<CalculationUpdate>, ApiError>,
) -> Result<Json<Calculation>, ApiError> {
    let mut calc = state
        .calculations
        .get(user.id, id)
        .await?
        .ok_or_else(not_found)?;

    if let Some(operation) = payload.operation {
        calc.operation = operation;
    }
    if let Some(operand1) = payload.operand1 {
        calc.operand1 = operand1;
    }
    if let Some(operand2) = payload.operand2 {
        calc.operand2 = operand2;
    }
    // Nothing is written unless the new combination is computable
    calc.result = calculate(calc.operation, calc.operand1, calc.operand2)?;

    state.calculations.update(&calc).await?;
    Ok(Json(calc))
}

/// DELETE /calculations/:id
pub async fn delete_calculation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.calculations.delete(user.id, id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
