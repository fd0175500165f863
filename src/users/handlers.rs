use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{repo_types::User, AuthUser},
    error::{AppError, AppResult},
    state::AppState,
    users::dto::{ProfileResponse, UpdateProfileRequest},
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/users/me",
        get(get_profile).put(update_profile).delete(deactivate),
    )
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    if let Err(msg) = payload.validate() {
        warn!(user_id = %user_id, reason = %msg, "profile update rejected");
        return Err(AppError::BadRequest(msg));
    }

    let user = User::update_profile(&state.db, user_id, &payload)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    info!(user_id = %user_id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn deactivate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    if !User::deactivate(&state.db, user_id).await? {
        return Err(AppError::not_found("User"));
    }
    info!(user_id = %user_id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::auth::services::JwtKeys;
    use axum::extract::FromRef;

    #[tokio::test]
    async fn profile_requires_token() {
        let app = user_routes().with_state(AppState::fake());
        let res = app
            .oneshot(Request::get("/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_profile_update_is_rejected_before_db() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(uuid::Uuid::new_v4())
            .unwrap();
        let app = user_routes().with_state(state);
        let res = app
            .oneshot(
                Request::put("/users/me")
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"age":-4}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
