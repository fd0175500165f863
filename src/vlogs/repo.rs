use sqlx::PgPool;
use uuid::Uuid;

use crate::vlogs::repo_types::{Vlog, VlogComment};

const VLOG_SELECT: &str = r#"
    SELECT v.id, v.user_id, v.title, v.image_key, v.description, v.created_at,
           (SELECT COUNT(*) FROM vlog_likes l WHERE l.vlog_id = v.id) AS likes,
           (SELECT COUNT(*) FROM vlog_comments c WHERE c.vlog_id = v.id) AS comments
    FROM vlogs v
"#;

const COMMENT_COLUMNS: &str = "id, vlog_id, user_id, comment, parent_id, created_at";

impl Vlog {
    pub async fn create(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
        title: &str,
        image_key: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Vlog> {
        sqlx::query(
            "INSERT INTO vlogs (id, user_id, title, image_key, description) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(image_key)
        .bind(description)
        .execute(db)
        .await?;
        Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("vlog {} vanished after insert", id))
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Vlog>> {
        let row = sqlx::query_as::<_, Vlog>(&format!("{} WHERE v.id = $1", VLOG_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Newest first.
    pub async fn list(db: &PgPool, skip: i64, limit: i64) -> anyhow::Result<Vec<Vlog>> {
        let rows = sqlx::query_as::<_, Vlog>(&format!(
            "{} ORDER BY v.created_at DESC, v.id LIMIT $1 OFFSET $2",
            VLOG_SELECT
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Comments and likes go with it (ON DELETE CASCADE).
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM vlogs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Removes the caller's like if present, adds it otherwise.
    /// Returns whether the vlog is now liked and the new like count.
    pub async fn toggle_like(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<(bool, i64)> {
        let mut tx = db.begin().await?;
        let removed = sqlx::query("DELETE FROM vlog_likes WHERE vlog_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        if !removed {
            sqlx::query(
                "INSERT INTO vlog_likes (vlog_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        let (likes,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vlog_likes WHERE vlog_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok((!removed, likes))
    }
}

impl VlogComment {
    pub async fn create(
        db: &PgPool,
        vlog_id: Uuid,
        user_id: Uuid,
        comment: &str,
        parent_id: Option<Uuid>,
    ) -> anyhow::Result<VlogComment> {
        let row = sqlx::query_as::<_, VlogComment>(&format!(
            r#"
            INSERT INTO vlog_comments (vlog_id, user_id, comment, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        ))
        .bind(vlog_id)
        .bind(user_id)
        .bind(comment)
        .bind(parent_id)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<VlogComment>> {
        let row = sqlx::query_as::<_, VlogComment>(&format!(
            "SELECT {} FROM vlog_comments WHERE id = $1",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Oldest first, so replies follow their parents.
    pub async fn list_for_vlog(db: &PgPool, vlog_id: Uuid) -> anyhow::Result<Vec<VlogComment>> {
        let rows = sqlx::query_as::<_, VlogComment>(&format!(
            "SELECT {} FROM vlog_comments WHERE vlog_id = $1 ORDER BY created_at ASC, id",
            COMMENT_COLUMNS
        ))
        .bind(vlog_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
