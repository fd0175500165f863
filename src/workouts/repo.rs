use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::workouts::repo_types::WorkoutRow;

const WORKOUT_SELECT: &str = r#"
    SELECT w.id, w.user_id, w.exercise_item_id, e.name, w.performed_at, w.duration_mins,
           e.calories_burnt, e.duration_mins AS reference_duration
    FROM user_exercises w
    JOIN exercise_items e ON e.id = w.exercise_item_id
"#;

impl WorkoutRow {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        exercise_item_id: Uuid,
        performed_at: OffsetDateTime,
        duration_mins: i32,
    ) -> anyhow::Result<WorkoutRow> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO user_exercises (user_id, exercise_item_id, performed_at, duration_mins)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(exercise_item_id)
        .bind(performed_at)
        .bind(duration_mins)
        .fetch_one(db)
        .await?;

        let row = sqlx::query_as::<_, WorkoutRow>(&format!("{} WHERE w.id = $1", WORKOUT_SELECT))
            .bind(id)
            .fetch_one(db)
            .await?;
        Ok(row)
    }

    /// Newest first within `[from, to)`.
    pub async fn list(
        db: &PgPool,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
        skip: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<WorkoutRow>> {
        let rows = sqlx::query_as::<_, WorkoutRow>(&format!(
            r#"
            {}
            WHERE w.user_id = $1
              AND ($2::timestamptz IS NULL OR w.performed_at >= $2)
              AND ($3::timestamptz IS NULL OR w.performed_at < $3)
            ORDER BY w.performed_at DESC, w.id
            LIMIT $4 OFFSET $5
            "#,
            WORKOUT_SELECT
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Deletes the log only if it belongs to `user_id`.
    pub async fn delete_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM user_exercises WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
