use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    catalog::{
        repo::{EXERCISE_COLUMNS, FOOD_COLUMNS},
        repo_types::{ExerciseItem, FoodItem},
    },
    recommendations::{
        scoring::UserProfile,
        types::{NewRecommendation, Recommendation, RecommendationRow},
    },
};

/// Everything the scorer reads, plus the write-once recommendations table.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// `None` for unknown or deactivated users.
    async fn profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;

    /// Predefined and user-owned foods, catalog insertion order.
    async fn food_candidates(&self, user_id: Uuid) -> anyhow::Result<Vec<FoodItem>>;

    async fn exercise_candidates(&self, user_id: Uuid) -> anyhow::Result<Vec<ExerciseItem>>;

    /// Foods eaten in meals dated `since..=until`.
    async fn recent_food_ids(
        &self,
        user_id: Uuid,
        since: Date,
        until: Date,
    ) -> anyhow::Result<HashSet<Uuid>>;

    /// Exercises logged in `[since, until)`.
    async fn recent_exercise_ids(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> anyhow::Result<HashSet<Uuid>>;

    /// Logged minutes of each session in `[since, until)`.
    async fn workout_durations(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> anyhow::Result<Vec<i32>>;

    async fn insert_recommendations(
        &self,
        recs: &[NewRecommendation],
    ) -> anyhow::Result<Vec<Recommendation>>;

    /// Newest first.
    async fn list_recommendations(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<Recommendation>>;
}

#[derive(Clone)]
pub struct PgRecommendationStore {
    db: PgPool,
}

impl PgRecommendationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const RECOMMENDATION_COLUMNS: &str =
    "id, user_id, kind, food_item_id, exercise_item_id, date, score, reason, created_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    age: Option<i32>,
    gender: Option<String>,
    weight_kg: Option<f64>,
    height_cm: Option<f64>,
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT age, gender, weight_kg, height_cm FROM users WHERE id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|r| UserProfile {
            age: r.age,
            gender: r.gender.as_deref().and_then(|g| g.parse().ok()),
            weight_kg: r.weight_kg,
            height_cm: r.height_cm,
        }))
    }

    async fn food_candidates(&self, user_id: Uuid) -> anyhow::Result<Vec<FoodItem>> {
        let rows = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {} FROM food_items WHERE is_predefined OR user_id = $1 ORDER BY created_at, id",
            FOOD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn exercise_candidates(&self, user_id: Uuid) -> anyhow::Result<Vec<ExerciseItem>> {
        let rows = sqlx::query_as::<_, ExerciseItem>(&format!(
            "SELECT {} FROM exercise_items WHERE is_predefined OR user_id = $1 ORDER BY created_at, id",
            EXERCISE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn recent_food_ids(
        &self,
        user_id: Uuid,
        since: Date,
        until: Date,
    ) -> anyhow::Result<HashSet<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT mi.food_item_id
            FROM meal_items mi
            JOIN meals m ON m.id = mi.meal_id
            WHERE m.user_id = $1 AND m.meal_date BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.db)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn recent_exercise_ids(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> anyhow::Result<HashSet<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT exercise_item_id
            FROM user_exercises
            WHERE user_id = $1 AND performed_at >= $2 AND performed_at < $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.db)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn workout_durations(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> anyhow::Result<Vec<i32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r#"
            SELECT duration_mins
            FROM user_exercises
            WHERE user_id = $1 AND performed_at >= $2 AND performed_at < $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    async fn insert_recommendations(
        &self,
        recs: &[NewRecommendation],
    ) -> anyhow::Result<Vec<Recommendation>> {
        let mut tx = self.db.begin().await?;
        let mut out = Vec::with_capacity(recs.len());
        for rec in recs {
            let row = sqlx::query_as::<_, RecommendationRow>(&format!(
                r#"
                INSERT INTO recommendations
                    (user_id, kind, food_item_id, exercise_item_id, date, score, reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                RECOMMENDATION_COLUMNS
            ))
            .bind(rec.user_id)
            .bind(rec.target.kind())
            .bind(rec.target.food_item_id())
            .bind(rec.target.exercise_item_id())
            .bind(rec.date)
            .bind(rec.score)
            .bind(&rec.reason)
            .fetch_one(&mut *tx)
            .await?;
            out.push(Recommendation::try_from(row)?);
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn list_recommendations(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let rows = sqlx::query_as::<_, RecommendationRow>(&format!(
            r#"
            SELECT {}
            FROM recommendations
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
            RECOMMENDATION_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Recommendation::try_from).collect()
    }
}
