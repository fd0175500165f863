use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// One row per (user, date); only ever written through an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyAnalytics {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub total_calories_in: i32,
    pub total_calories_out: i32,
    pub net_calories: i32,
}

/// Averages are taken over the rows that exist in the window, not the calendar span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub start: Date,
    pub end: Date,
    pub total_days: i64,
    pub avg_calories_in: f64,
    pub avg_calories_out: f64,
    pub avg_net_calories: f64,
    pub total_calories_in: i64,
    pub total_calories_out: i64,
}

impl AnalyticsSummary {
    pub fn from_rows(start: Date, end: Date, rows: &[DailyAnalytics]) -> Self {
        let total_days = rows.len() as i64;
        let total_in: i64 = rows.iter().map(|r| i64::from(r.total_calories_in)).sum();
        let total_out: i64 = rows.iter().map(|r| i64::from(r.total_calories_out)).sum();
        let total_net: i64 = rows.iter().map(|r| i64::from(r.net_calories)).sum();

        let avg = |sum: i64| {
            if total_days == 0 {
                0.0
            } else {
                sum as f64 / total_days as f64
            }
        };

        Self {
            start,
            end,
            total_days,
            avg_calories_in: avg(total_in),
            avg_calories_out: avg(total_out),
            avg_net_calories: avg(total_net),
            total_calories_in: total_in,
            total_calories_out: total_out,
        }
    }
}

/// A meal line joined to its catalog food.
#[derive(Debug, Clone, FromRow)]
pub struct IntakeRow {
    pub calories: i32,
    pub quantity: i32,
}

/// An exercise log joined to its catalog exercise.
#[derive(Debug, Clone, FromRow)]
pub struct BurnRow {
    pub exercise_item_id: Uuid,
    pub calories_burnt: i32,
    pub reference_duration: i32,
    pub duration_mins: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayOutcome {
    Computed { analytics: DailyAnalytics },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayResult {
    pub date: Date,
    #[serde(flatten)]
    pub outcome: DayOutcome,
}

/// Per-day outcomes of a backfill; one failing day never hides the others.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillReport {
    pub user_id: Uuid,
    pub days: Vec<DayResult>,
}

impl BackfillReport {
    pub fn computed(&self) -> usize {
        self.days
            .iter()
            .filter(|d| matches!(d.outcome, DayOutcome::Computed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.days.len() - self.computed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(date: Date, cin: i32, cout: i32) -> DailyAnalytics {
        DailyAnalytics {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date,
            total_calories_in: cin,
            total_calories_out: cout,
            net_calories: cin - cout,
        }
    }

    #[test]
    fn empty_window_is_all_zero() {
        let s = AnalyticsSummary::from_rows(date!(2024 - 01 - 01), date!(2024 - 01 - 31), &[]);
        assert_eq!(s.total_days, 0);
        assert_eq!(s.avg_calories_in, 0.0);
        assert_eq!(s.avg_calories_out, 0.0);
        assert_eq!(s.avg_net_calories, 0.0);
        assert_eq!(s.total_calories_in, 0);
        assert_eq!(s.total_calories_out, 0);
    }

    #[test]
    fn averages_divide_by_existing_rows() {
        let rows = [
            row(date!(2024 - 01 - 01), 2000, 500),
            row(date!(2024 - 01 - 10), 1000, 300),
        ];
        let s = AnalyticsSummary::from_rows(date!(2024 - 01 - 01), date!(2024 - 01 - 31), &rows);
        assert_eq!(s.total_days, 2);
        assert_eq!(s.avg_calories_in, 1500.0);
        assert_eq!(s.avg_calories_out, 400.0);
        assert_eq!(s.avg_net_calories, 1100.0);
        assert_eq!(s.total_calories_in, 3000);
    }

    #[test]
    fn day_outcome_serializes_with_status_tag() {
        let failed = DayResult {
            date: date!(2024 - 01 - 02),
            outcome: DayOutcome::Failed {
                error: "boom".into(),
            },
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }
}
