//! Analytics
//! Mission: Summarise a user's calculation history

use crate::calculator::Operation;
use crate::models::{Calculation, CalculationStats, HistoryFilter};
use crate::store::CalculationRepository;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub operation: Operation,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_calculations: i64,
    pub total_users: i64,
    pub operations_breakdown: Vec<OperationStats>,
    pub most_used_operation: Option<Operation>,
    pub average_result: Option<f64>,
    pub latest_calculation: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryPage {
    pub items: Vec<Calculation>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Build the summary from raw aggregates.
pub fn summarize(stats: CalculationStats) -> AnalyticsSummary {
    if stats.total == 0 {
        return AnalyticsSummary {
            total_calculations: 0,
            total_users: 1,
            operations_breakdown: Vec::new(),
            most_used_operation: None,
            average_result: None,
            latest_calculation: None,
        };
    }

    let total = stats.total;
    let mut breakdown: Vec<OperationStats> = stats
        .operation_counts
        .into_iter()
        .map(|(operation, count)| OperationStats {
            operation,
            count,
            percentage: round_to(count as f64 / total as f64 * 100.0, 2),
        })
        .collect();
    // Most used first; ties keep a stable, name-ordered position
    breakdown.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.operation.as_str().cmp(b.operation.as_str()))
    });

    AnalyticsSummary {
        total_calculations: total,
        total_users: 1,
        most_used_operation: breakdown.first().map(|s| s.operation),
        operations_breakdown: breakdown,
        average_result: stats.average_result.map(|avg| round_to(avg, 4)),
        latest_calculation: stats.latest_created_at,
    }
}

pub async fn user_summary(
    repo: &dyn CalculationRepository,
    user_id: i64,
) -> Result<AnalyticsSummary> {
    Ok(summarize(repo.stats(user_id).await?))
}

pub async fn calculation_history(
    repo: &dyn CalculationRepository,
    user_id: i64,
    filter: HistoryFilter,
) -> Result<HistoryPage> {
    let (items, total) = repo.history(user_id, &filter).await?;
    Ok(HistoryPage {
        items,
        total,
        limit: filter.limit,
        offset: filter.offset,
        has_more: filter.offset.saturating_add(filter.limit) < total,
    })
}
