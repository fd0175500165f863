use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A vlog post with its like and comment counts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vlog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip)]
    pub image_key: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub likes: i64,
    pub comments: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VlogComment {
    pub id: Uuid,
    pub vlog_id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    pub parent_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}
