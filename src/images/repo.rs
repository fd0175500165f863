use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::images::{
    analysis::ImageAnalysis,
    repo_types::{Image, NewImage},
};

const IMAGE_COLUMNS: &str = "id, user_id, meal_id, s3_key, original_filename, \
    content_type, file_size, description, is_food, analysis_description, food_items, \
    estimated_calories, nutrients, analysis_confidence, analysis_completed, created_at";

impl Image {
    pub async fn insert(db: &PgPool, new: &NewImage<'_>) -> anyhow::Result<Image> {
        let row = sqlx::query_as::<_, Image>(&format!(
            r#"
            INSERT INTO images
                (id, user_id, meal_id, s3_key, original_filename, content_type, file_size, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        ))
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.meal_id)
        .bind(new.s3_key)
        .bind(new.original_filename)
        .bind(new.content_type)
        .bind(new.file_size)
        .bind(new.description)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Image>> {
        let row = sqlx::query_as::<_, Image>(&format!(
            "SELECT {} FROM images WHERE id = $1 AND user_id = $2",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Newest first.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Image>> {
        let rows = sqlx::query_as::<_, Image>(&format!(
            r#"
            SELECT {}
            FROM images
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            IMAGE_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Earliest upload attached to the meal.
    pub async fn first_for_meal(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Option<Image>> {
        let row = sqlx::query_as::<_, Image>(&format!(
            r#"
            SELECT {}
            FROM images
            WHERE meal_id = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
            IMAGE_COLUMNS
        ))
        .bind(meal_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn ids_for_meals(db: &PgPool, meal_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, Uuid)>> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT meal_id, id
            FROM images
            WHERE meal_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(meal_ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn record_analysis(
        db: &PgPool,
        id: Uuid,
        analysis: &ImageAnalysis,
    ) -> anyhow::Result<Image> {
        let row = sqlx::query_as::<_, Image>(&format!(
            r#"
            UPDATE images
            SET is_food = $2,
                analysis_description = $3,
                food_items = $4,
                estimated_calories = $5,
                nutrients = $6,
                analysis_confidence = $7,
                analysis_completed = now()
            WHERE id = $1
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        ))
        .bind(id)
        .bind(analysis.is_food)
        .bind(&analysis.description)
        .bind(Json(&analysis.food_items))
        .bind(analysis.estimated_calories)
        .bind(Json(&analysis.nutrients))
        .bind(analysis.confidence)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
