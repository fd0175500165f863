use crate::auth::repo_types::User;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str = "id, name, email, password_hash, role, age, gender, \
     weight_kg, height_cm, is_active, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id, active or not.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
