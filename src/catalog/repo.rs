use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::{
    dto::{
        CatalogQuery, CreateExerciseRequest, CreateFoodRequest, UpdateExerciseRequest,
        UpdateFoodRequest,
    },
    repo_types::{ExerciseItem, FoodItem},
};

pub(crate) const FOOD_COLUMNS: &str = "id, name, calories, protein_g, carbs_g, fat_g, fiber_g, \
     category, is_predefined, user_id, created_at";

pub(crate) const EXERCISE_COLUMNS: &str = "id, name, duration_mins, calories_burnt, difficulty, \
     requires_equipment, muscle_groups, is_predefined, user_id, created_at";

impl FoodItem {
    /// Predefined items plus the caller's own, in insertion order.
    pub async fn list_visible(
        db: &PgPool,
        user_id: Uuid,
        q: &CatalogQuery,
    ) -> anyhow::Result<Vec<FoodItem>> {
        let rows = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            SELECT {}
            FROM food_items
            WHERE (is_predefined OR user_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY created_at, id
            OFFSET $3 LIMIT $4
            "#,
            FOOD_COLUMNS
        ))
        .bind(user_id)
        .bind(q.pattern())
        .bind(q.skip())
        .bind(q.limit())
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<FoodItem>> {
        let row = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {} FROM food_items WHERE id = $1",
            FOOD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Visible items whose name contains any of `names` (case-insensitive).
    pub async fn match_names(
        db: &PgPool,
        user_id: Uuid,
        names: &[String],
    ) -> anyhow::Result<Vec<FoodItem>> {
        let patterns: Vec<String> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", n))
            .collect();
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            SELECT {}
            FROM food_items
            WHERE (is_predefined OR user_id = $1)
              AND name ILIKE ANY($2)
            ORDER BY created_at, id
            LIMIT 20
            "#,
            FOOD_COLUMNS
        ))
        .bind(user_id)
        .bind(&patterns)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        owner: Option<Uuid>,
        req: &CreateFoodRequest,
    ) -> anyhow::Result<FoodItem> {
        let row = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            INSERT INTO food_items
                (name, calories, protein_g, carbs_g, fat_g, fiber_g, category, is_predefined, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            FOOD_COLUMNS
        ))
        .bind(req.name.trim())
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .bind(req.fiber_g)
        .bind(req.category.map(|c| c.as_str()))
        .bind(req.is_predefined)
        .bind(owner)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        req: &UpdateFoodRequest,
    ) -> anyhow::Result<Option<FoodItem>> {
        let row = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            UPDATE food_items SET
                name      = COALESCE($2, name),
                calories  = COALESCE($3, calories),
                protein_g = COALESCE($4, protein_g),
                carbs_g   = COALESCE($5, carbs_g),
                fat_g     = COALESCE($6, fat_g),
                fiber_g   = COALESCE($7, fiber_g),
                category  = COALESCE($8, category)
            WHERE id = $1
            RETURNING {}
            "#,
            FOOD_COLUMNS
        ))
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .bind(req.fiber_g)
        .bind(req.category.map(|c| c.as_str()))
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM food_items WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}

impl ExerciseItem {
    pub async fn list_visible(
        db: &PgPool,
        user_id: Uuid,
        q: &CatalogQuery,
    ) -> anyhow::Result<Vec<ExerciseItem>> {
        let rows = sqlx::query_as::<_, ExerciseItem>(&format!(
            r#"
            SELECT {}
            FROM exercise_items
            WHERE (is_predefined OR user_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY created_at, id
            OFFSET $3 LIMIT $4
            "#,
            EXERCISE_COLUMNS
        ))
        .bind(user_id)
        .bind(q.pattern())
        .bind(q.skip())
        .bind(q.limit())
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ExerciseItem>> {
        let row = sqlx::query_as::<_, ExerciseItem>(&format!(
            "SELECT {} FROM exercise_items WHERE id = $1",
            EXERCISE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        owner: Option<Uuid>,
        req: &CreateExerciseRequest,
    ) -> anyhow::Result<ExerciseItem> {
        let row = sqlx::query_as::<_, ExerciseItem>(&format!(
            r#"
            INSERT INTO exercise_items
                (name, duration_mins, calories_burnt, difficulty, requires_equipment,
                 muscle_groups, is_predefined, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            EXERCISE_COLUMNS
        ))
        .bind(req.name.trim())
        .bind(req.duration_mins)
        .bind(req.calories_burnt)
        .bind(req.difficulty.map(|d| d.as_str()))
        .bind(req.requires_equipment)
        .bind(&req.muscle_groups)
        .bind(req.is_predefined)
        .bind(owner)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        req: &UpdateExerciseRequest,
    ) -> anyhow::Result<Option<ExerciseItem>> {
        let row = sqlx::query_as::<_, ExerciseItem>(&format!(
            r#"
            UPDATE exercise_items SET
                name               = COALESCE($2, name),
                duration_mins      = COALESCE($3, duration_mins),
                calories_burnt     = COALESCE($4, calories_burnt),
                difficulty         = COALESCE($5, difficulty),
                requires_equipment = COALESCE($6, requires_equipment),
                muscle_groups      = COALESCE($7, muscle_groups)
            WHERE id = $1
            RETURNING {}
            "#,
            EXERCISE_COLUMNS
        ))
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.duration_mins)
        .bind(req.calories_burnt)
        .bind(req.difficulty.map(|d| d.as_str()))
        .bind(req.requires_equipment)
        .bind(req.muscle_groups.as_ref())
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM exercise_items WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
