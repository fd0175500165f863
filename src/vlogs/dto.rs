use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vlogs::repo_types::Vlog;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_COMMENT_LEN: usize = 2000;

pub fn validate_title(title: Option<&str>) -> Result<String, String> {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("title is required")?;
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("title must be at most {} characters", MAX_TITLE_LEN));
    }
    Ok(title.to_string())
}

#[derive(Debug, Serialize)]
pub struct VlogResponse {
    #[serde(flatten)]
    pub vlog: Vlog,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
    pub parent_id: Option<Uuid>,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), String> {
        let text = self.comment.trim();
        if text.is_empty() {
            return Err("comment must not be empty".into());
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(format!("comment must be at most {} characters", MAX_COMMENT_LEN));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_rules() {
        assert_eq!(validate_title(Some("  Morning run ")).unwrap(), "Morning run");
        assert!(validate_title(None).is_err());
        assert!(validate_title(Some("   ")).is_err());
        assert!(validate_title(Some(&"x".repeat(MAX_TITLE_LEN + 1))).is_err());
    }

    #[test]
    fn blank_comment_is_rejected() {
        let req = CommentRequest {
            comment: " \n".into(),
            parent_id: None,
        };
        assert!(req.validate().is_err());
    }
}
