use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{repo::USER_COLUMNS, repo_types::User};
use crate::users::dto::UpdateProfileRequest;

impl User {
    /// Applies a partial profile update; `None` fields keep their value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        req: &UpdateProfileRequest,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name       = COALESCE($2, name),
                age        = COALESCE($3, age),
                gender     = COALESCE($4, gender),
                weight_kg  = COALESCE($5, weight_kg),
                height_cm  = COALESCE($6, height_cm),
                updated_at = now()
            WHERE id = $1 AND is_active
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.age)
        .bind(req.gender.map(|g| g.as_str()))
        .bind(req.weight_kg)
        .bind(req.height_cm)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Soft-deactivates the account. Returns false when it was already inactive or missing.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET is_active = FALSE, updated_at = now() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn list_active_ids(db: &PgPool) -> anyhow::Result<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE is_active ORDER BY created_at")
                .fetch_all(db)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
