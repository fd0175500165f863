use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        password::{check_policy, hash_password, verify_password},
        repo_types::User,
        services::{is_valid_email, JwtKeys},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn issue_tokens(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::Internal(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if let Err(msg) = check_policy(&payload.password) {
        warn!("password rejected by policy");
        return Err(AppError::BadRequest(msg));
    }

    // Ensure email is not taken
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, name, &payload.email, &hash).await?;

    let response = issue_tokens(&state, &user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AppError::Unauthenticated("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated("Invalid credentials".into()));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(AppError::Unauthenticated("Account is deactivated".into()));
    }

    let response = issue_tokens(&state, &user)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    Ok(Json(issue_tokens(&state, &user)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn register_rejects_short_password_before_touching_db() {
        let app = auth_routes().with_state(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/auth/register")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name":"Ann","email":"ann@example.com","password":"short"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(uuid::Uuid::new_v4())
            .unwrap();
        let app = auth_routes().with_state(state);
        let res = app
            .oneshot(
                Request::post("/auth/refresh")
                    .header("content-type", "application/json")
                    .body(Body::from(format!(r#"{{"refresh_token":"{}"}}"#, token)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
