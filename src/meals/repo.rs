use std::collections::HashSet;

use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, Time};
use uuid::Uuid;

use crate::meals::{
    dto::MealItemInput,
    repo_types::{Meal, MealItemLine},
};

const MEAL_COLUMNS: &str = "id, user_id, meal_date, meal_time, created_at";

async fn insert_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    items: &[MealItemInput],
) -> anyhow::Result<()> {
    for item in items {
        sqlx::query("INSERT INTO meal_items (meal_id, food_item_id, quantity) VALUES ($1, $2, $3)")
            .bind(meal_id)
            .bind(item.food_item_id)
            .bind(item.quantity)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

impl Meal {
    /// Inserts the meal and its items in one transaction.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        meal_date: Date,
        meal_time: Time,
        items: &[MealItemInput],
    ) -> anyhow::Result<Meal> {
        let mut tx = db.begin().await?;
        let meal = sqlx::query_as::<_, Meal>(&format!(
            "INSERT INTO meals (user_id, meal_date, meal_time) VALUES ($1, $2, $3) RETURNING {}",
            MEAL_COLUMNS
        ))
        .bind(user_id)
        .bind(meal_date)
        .bind(meal_time)
        .fetch_one(&mut *tx)
        .await?;
        insert_items_tx(&mut tx, meal.id, items).await?;
        tx.commit().await?;
        Ok(meal)
    }

    pub async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, Meal>(&format!(
            "SELECT {} FROM meals WHERE id = $1 AND user_id = $2",
            MEAL_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Newest first, optionally bounded by inclusive dates.
    pub async fn list(
        db: &PgPool,
        user_id: Uuid,
        start: Option<Date>,
        end: Option<Date>,
        skip: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, Meal>(&format!(
            r#"
            SELECT {}
            FROM meals
            WHERE user_id = $1
              AND ($2::date IS NULL OR meal_date >= $2)
              AND ($3::date IS NULL OR meal_date <= $3)
            ORDER BY meal_date DESC, meal_time DESC, id
            LIMIT $4 OFFSET $5
            "#,
            MEAL_COLUMNS
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Updates date/time when given and replaces the items when `items` is `Some`.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        meal_date: Option<Date>,
        meal_time: Option<Time>,
        items: Option<&[MealItemInput]>,
    ) -> anyhow::Result<Meal> {
        let mut tx = db.begin().await?;
        let meal = sqlx::query_as::<_, Meal>(&format!(
            r#"
            UPDATE meals
            SET meal_date = COALESCE($2, meal_date),
                meal_time = COALESCE($3, meal_time)
            WHERE id = $1
            RETURNING {}
            "#,
            MEAL_COLUMNS
        ))
        .bind(id)
        .bind(meal_date)
        .bind(meal_time)
        .fetch_one(&mut *tx)
        .await?;
        if let Some(items) = items {
            sqlx::query("DELETE FROM meal_items WHERE meal_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_items_tx(&mut tx, id, items).await?;
        }
        tx.commit().await?;
        Ok(meal)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl MealItemLine {
    pub async fn for_meals(db: &PgPool, meal_ids: &[Uuid]) -> anyhow::Result<Vec<MealItemLine>> {
        let rows = sqlx::query_as::<_, MealItemLine>(
            r#"
            SELECT mi.id, mi.meal_id, mi.food_item_id, f.name, f.calories, mi.quantity
            FROM meal_items mi
            JOIN food_items f ON f.id = mi.food_item_id
            WHERE mi.meal_id = ANY($1)
            ORDER BY mi.meal_id, f.name
            "#,
        )
        .bind(meal_ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// The subset of `ids` the user may reference: predefined or owned.
pub async fn visible_food_ids(
    db: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<HashSet<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM food_items WHERE id = ANY($1) AND (is_predefined OR user_id = $2)",
    )
    .bind(ids)
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
