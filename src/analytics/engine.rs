use std::sync::Arc;

use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    analytics::{
        store::AnalyticsStore,
        types::{
            AnalyticsSummary, BackfillReport, BurnRow, DailyAnalytics, DayOutcome, DayResult,
            IntakeRow,
        },
    },
    catalog::repo_types::per_minute,
    config::EngineConfig,
    error::{AppError, AppResult},
};

/// Σ food.calories × quantity.
pub fn calories_in(rows: &[IntakeRow]) -> f64 {
    rows.iter()
        .map(|r| f64::from(r.calories) * f64::from(r.quantity))
        .sum()
}

/// Σ calories_burnt × logged / reference duration. A non-positive reference
/// duration fails the whole day.
pub fn calories_out(rows: &[BurnRow]) -> AppResult<f64> {
    rows.iter().try_fold(0.0, |acc, r| {
        let rate = per_minute(r.exercise_item_id, r.calories_burnt, r.reference_duration)?;
        Ok(acc + rate * f64::from(r.duration_mins))
    })
}

fn truncate(v: f64) -> i32 {
    v.trunc() as i32
}

/// Daily calorie aggregator. Reads logs, writes one analytics row per (user, date).
pub struct AnalyticsEngine {
    store: Arc<dyn AnalyticsStore>,
    config: EngineConfig,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn AnalyticsStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(skip(self))]
    pub async fn compute_daily(&self, user_id: Uuid, date: Date) -> AppResult<DailyAnalytics> {
        let intake = self.store.intake_for_day(user_id, date).await?;
        let burn = self.store.burn_for_day(user_id, date).await?;

        let cal_in = truncate(calories_in(&intake));
        let cal_out = truncate(calories_out(&burn)?);
        let net = cal_in - cal_out;

        let row = self
            .store
            .upsert_daily(user_id, date, cal_in, cal_out, net)
            .await?;
        debug!(user_id = %user_id, %date, cal_in, cal_out, net, "daily analytics stored");
        Ok(row)
    }

    /// Recomputes today and the `days_back - 1` days before it.
    pub async fn backfill(&self, user_id: Uuid, days_back: u32) -> BackfillReport {
        self.backfill_from(user_id, OffsetDateTime::now_utc().date(), days_back)
            .await
    }

    #[instrument(skip(self))]
    pub async fn backfill_from(&self, user_id: Uuid, today: Date, days_back: u32) -> BackfillReport {
        let mut days = Vec::with_capacity(days_back as usize);
        for offset in 0..i64::from(days_back) {
            let date = today - Duration::days(offset);
            let outcome = match self.compute_daily(user_id, date).await {
                Ok(analytics) => DayOutcome::Computed { analytics },
                Err(e) => {
                    warn!(user_id = %user_id, %date, error = %e, "backfill day failed");
                    DayOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            days.push(DayResult { date, outcome });
        }

        let report = BackfillReport { user_id, days };
        info!(
            user_id = %user_id,
            computed = report.computed(),
            failed = report.failed(),
            "analytics backfill finished"
        );
        report
    }

    /// Reads stored rows only; never recomputes.
    #[instrument(skip(self))]
    pub async fn summarize(
        &self,
        user_id: Uuid,
        start: Date,
        end: Date,
    ) -> AppResult<AnalyticsSummary> {
        if start > end {
            return Err(AppError::BadRequest("start must not be after end".into()));
        }
        let rows = self.store.list_daily(user_id, Some(start), Some(end)).await?;
        Ok(AnalyticsSummary::from_rows(start, end, &rows))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        start: Option<Date>,
        end: Option<Date>,
    ) -> AppResult<Vec<DailyAnalytics>> {
        Ok(self.store.list_daily(user_id, start, end).await?)
    }
}
