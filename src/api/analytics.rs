//! Analytics & history endpoints.

use crate::analytics::{
    self, AnalyticsSummary, HistoryPage, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
use crate::api::{ApiError, AppState};
use crate::auth::middleware::CurrentUser;
use crate::calculator::Operation;
use crate::models::HistoryFilter;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub operation: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    pub message: String,
    pub deleted_count: usize,
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a bare date.
fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(ApiError::Validation(format!("{field} is not a valid datetime")))
}

impl HistoryQuery {
    pub fn into_filter(self) -> Result<HistoryFilter, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}"
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::Validation("offset must be >= 0".to_string()));
        }

        let operation = match self.operation.as_deref() {
            None | Some("") => None,
            Some(name) => Some(Operation::from_str(name).ok_or_else(|| {
                ApiError::Validation(format!("Invalid operation: {name}"))
            })?),
        };

        Ok(HistoryFilter {
            operation,
            start_date: self
                .start_date
                .as_deref()
                .map(|raw| parse_date("start_date", raw))
                .transpose()?,
            end_date: self
                .end_date
                .as_deref()
                .map(|raw| parse_date("end_date", raw))
                .transpose()?,
            limit,
            offset,
        })
    }
}

/// GET /analytics/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let summary = analytics::user_summary(state.calculations.as_ref(), user.id).await?;
    Ok(Json(summary))
}

/// GET /analytics/history
pub async fn get_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Query(query), _): WithRejection<Query<HistoryQuery>, ApiError>,
) -> Result<Json<HistoryPage>, ApiError> {
    let filter = query.into_filter()?;
    let page = analytics::calculation_history(state.calculations.as_ref(), user.id, filter).await?;
    Ok(Json(page))
}

/// DELETE /analytics/history
pub async fn clear_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ClearHistoryResponse>, ApiError> {
    let deleted_count = state.calculations.delete_all(user.id).await?;
    Ok(Json(ClearHistoryResponse {
        message: "Calculation history cleared successfully".to_string(),
        deleted_count,
    }))
}
