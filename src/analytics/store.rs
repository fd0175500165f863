use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::analytics::types::{BurnRow, DailyAnalytics, IntakeRow};

/// Read side of the logging store plus the analytics table.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Meal lines of the user's meals dated `date`.
    async fn intake_for_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<IntakeRow>>;

    /// Exercise logs whose `performed_at` falls on `date` (UTC).
    async fn burn_for_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<BurnRow>>;

    /// Insert or overwrite the (user, date) row in one atomic statement.
    async fn upsert_daily(
        &self,
        user_id: Uuid,
        date: Date,
        calories_in: i32,
        calories_out: i32,
        net: i32,
    ) -> anyhow::Result<DailyAnalytics>;

    /// Stored rows in the inclusive window, newest first.
    async fn list_daily(
        &self,
        user_id: Uuid,
        start: Option<Date>,
        end: Option<Date>,
    ) -> anyhow::Result<Vec<DailyAnalytics>>;
}

/// `[start, end)` of a UTC calendar day.
pub(crate) fn day_bounds(date: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = date.with_time(Time::MIDNIGHT).assume_utc();
    (start, start + time::Duration::DAY)
}

#[derive(Clone)]
pub struct PgAnalyticsStore {
    db: PgPool,
}

impl PgAnalyticsStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnalyticsStore for PgAnalyticsStore {
    async fn intake_for_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<IntakeRow>> {
        let rows = sqlx::query_as::<_, IntakeRow>(
            r#"
            SELECT f.calories, mi.quantity
            FROM meal_items mi
            JOIN meals m ON m.id = mi.meal_id
            JOIN food_items f ON f.id = mi.food_item_id
            WHERE m.user_id = $1 AND m.meal_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn burn_for_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<BurnRow>> {
        let (from, to) = day_bounds(date);
        let rows = sqlx::query_as::<_, BurnRow>(
            r#"
            SELECT ue.exercise_item_id,
                   e.calories_burnt,
                   e.duration_mins AS reference_duration,
                   ue.duration_mins
            FROM user_exercises ue
            JOIN exercise_items e ON e.id = ue.exercise_item_id
            WHERE ue.user_id = $1
              AND ue.performed_at >= $2
              AND ue.performed_at < $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn upsert_daily(
        &self,
        user_id: Uuid,
        date: Date,
        calories_in: i32,
        calories_out: i32,
        net: i32,
    ) -> anyhow::Result<DailyAnalytics> {
        let row = sqlx::query_as::<_, DailyAnalytics>(
            r#"
            INSERT INTO analytics (user_id, date, total_calories_in, total_calories_out, net_calories)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT analytics_user_date_key DO UPDATE SET
                total_calories_in  = EXCLUDED.total_calories_in,
                total_calories_out = EXCLUDED.total_calories_out,
                net_calories       = EXCLUDED.net_calories
            RETURNING id, user_id, date, total_calories_in, total_calories_out, net_calories
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(calories_in)
        .bind(calories_out)
        .bind(net)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_daily(
        &self,
        user_id: Uuid,
        start: Option<Date>,
        end: Option<Date>,
    ) -> anyhow::Result<Vec<DailyAnalytics>> {
        let rows = sqlx::query_as::<_, DailyAnalytics>(
            r#"
            SELECT id, user_id, date, total_calories_in, total_calories_out, net_calories
            FROM analytics
            WHERE user_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let (from, to) = day_bounds(date!(2024 - 01 - 01));
        assert_eq!(from, datetime!(2024-01-01 0:00 UTC));
        assert_eq!(to, datetime!(2024-01-02 0:00 UTC));
    }

    // Needs DATABASE_URL; run with `cargo test -- --ignored`.
    #[sqlx::test]
    #[ignore]
    async fn upsert_keeps_one_row_per_user_and_day(pool: PgPool) {
        let user = crate::auth::repo_types::User::create(&pool, "Ann", "ann@example.com", "x")
            .await
            .unwrap();
        let store = PgAnalyticsStore::new(pool.clone());
        let day = date!(2024 - 03 - 01);

        let first = store.upsert_daily(user.id, day, 500, 200, 300).await.unwrap();
        let second = store.upsert_daily(user.id, day, 800, 100, 700).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.net_calories, 700);

        let rows = store.list_daily(user.id, Some(day), Some(day)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_calories_in, 800);
    }
}
