use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ensure_owner, AppResult},
    recommendations::{
        scoring::MealType,
        types::{DailyPlan, Recommendation, RecommendedExercise, RecommendedFood},
    },
    state::AppState,
};

pub fn recommendation_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations/:user_id", get(list_recommendations))
        .route("/recommendations/:user_id/foods", post(recommend_foods))
        .route("/recommendations/:user_id/exercises", post(recommend_exercises))
        .route("/recommendations/:user_id/daily", post(generate_daily))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FoodQuery {
    pub meal_type: MealType,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<Date>,
}

#[instrument(skip(state))]
pub async fn list_recommendations(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<LimitQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    ensure_owner(caller, user_id)?;
    Ok(Json(state.recommender.list(user_id, q.limit).await?))
}

#[instrument(skip(state))]
pub async fn recommend_foods(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<FoodQuery>,
) -> AppResult<Json<Vec<RecommendedFood>>> {
    ensure_owner(caller, user_id)?;
    Ok(Json(
        state
            .recommender
            .recommend_foods(user_id, q.meal_type, q.limit)
            .await?,
    ))
}

#[instrument(skip(state))]
pub async fn recommend_exercises(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<LimitQuery>,
) -> AppResult<Json<Vec<RecommendedExercise>>> {
    ensure_owner(caller, user_id)?;
    Ok(Json(
        state
            .recommender
            .recommend_exercises(user_id, q.limit)
            .await?,
    ))
}

#[instrument(skip(state))]
pub async fn generate_daily(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<DailyQuery>,
) -> AppResult<Json<DailyPlan>> {
    ensure_owner(caller, user_id)?;
    let date = q.date.unwrap_or_else(|| OffsetDateTime::now_utc().date());
    Ok(Json(state.recommender.generate_daily(user_id, date).await?))
}
