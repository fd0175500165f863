use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    /// The caller is authenticated but does not own the targeted resource.
    #[error("not authorized to access this resource")]
    Unauthorized,

    /// A catalog exercise whose reference duration cannot scale calories.
    #[error("exercise item {exercise_item_id} has invalid reference duration {duration_mins}")]
    InvalidCatalogData {
        exercise_item_id: Uuid,
        duration_mins: i32,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::InvalidCatalogData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Unauthorized => {
                debug!("ownership check rejected request");
                self.to_string()
            }
            AppError::InvalidCatalogData { .. } => {
                error!(error = %self, "corrupt catalog data");
                self.to_string()
            }
            AppError::ExternalService(_) => {
                warn!(error = %self, "external service failed");
                self.to_string()
            }
            AppError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            AppError::Database(e) => {
                error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, message).into_response()
    }
}

/// Maps a foreign key violation (row still referenced) to `Conflict`.
pub fn still_referenced(e: sqlx::Error, what: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::Conflict(format!("{} is still referenced", what))
        }
        _ => AppError::Database(e),
    }
}

/// Rejects the request unless the caller is the user named in the path.
pub fn ensure_owner(caller: Uuid, owner: Uuid) -> AppResult<()> {
    if caller == owner {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::not_found("Meal").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::InvalidCatalogData {
                exercise_item_id: Uuid::nil(),
                duration_mins: 0
            }
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_resource() {
        assert_eq!(AppError::not_found("Food item").to_string(), "Food item not found");
    }

    #[test]
    fn ensure_owner_rejects_other_users() {
        let me = Uuid::new_v4();
        assert!(ensure_owner(me, me).is_ok());
        assert!(matches!(
            ensure_owner(me, Uuid::new_v4()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn internal_errors_hide_details() {
        let res = AppError::Internal(anyhow::anyhow!("secret connection string")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
