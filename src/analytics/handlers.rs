use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use time::{Date, Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    analytics::types::{AnalyticsSummary, BackfillReport, DailyAnalytics},
    auth::AuthUser,
    error::{ensure_owner, AppError, AppResult},
    state::AppState,
};

/// Largest window `/backfill` accepts in one call.
const MAX_BACKFILL_DAYS: u32 = 366;

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/:user_id", get(list_analytics))
        .route("/analytics/:user_id/compute", post(compute))
        .route("/analytics/:user_id/backfill", post(backfill))
        .route("/analytics/:user_id/summary", get(summary))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComputeQuery {
    pub date: Option<Date>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackfillQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub days: Option<i64>,
}

impl SummaryQuery {
    /// Explicit bounds win; otherwise `days` (default 30) back from `today`.
    pub fn window(&self, today: Date) -> AppResult<(Date, Date)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok((start, end)),
            (None, None) => {
                let days = self.days.unwrap_or(30);
                if days <= 0 {
                    return Err(AppError::BadRequest("days must be positive".into()));
                }
                Ok((today - Duration::days(days - 1), today))
            }
            _ => Err(AppError::BadRequest(
                "start and end must be given together".into(),
            )),
        }
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

#[instrument(skip(state))]
pub async fn list_analytics(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Vec<DailyAnalytics>>> {
    ensure_owner(caller, user_id)?;
    Ok(Json(state.analytics.list(user_id, q.start, q.end).await?))
}

#[instrument(skip(state))]
pub async fn compute(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<ComputeQuery>,
) -> AppResult<Json<DailyAnalytics>> {
    ensure_owner(caller, user_id)?;
    let date = q.date.unwrap_or_else(today);
    let row = state.analytics.compute_daily(user_id, date).await?;
    info!(user_id = %user_id, %date, net = row.net_calories, "analytics computed on demand");
    Ok(Json(row))
}

#[instrument(skip(state))]
pub async fn backfill(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<BackfillQuery>,
) -> AppResult<Json<BackfillReport>> {
    ensure_owner(caller, user_id)?;
    let days = q
        .days
        .unwrap_or(state.analytics.config().backfill_days);
    if days == 0 || days > MAX_BACKFILL_DAYS {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_BACKFILL_DAYS
        )));
    }
    Ok(Json(state.analytics.backfill(user_id, days).await))
}

#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<SummaryQuery>,
) -> AppResult<Json<AnalyticsSummary>> {
    ensure_owner(caller, user_id)?;
    let (start, end) = q.window(today())?;
    Ok(Json(state.analytics.summarize(user_id, start, end).await?))
}
