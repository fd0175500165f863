use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    catalog::repo_types::ExerciseItem,
    error::{AppError, AppResult},
    state::AppState,
    workouts::{
        dto::{LogWorkoutRequest, WorkoutListQuery},
        repo_types::{Workout, WorkoutRow},
    },
};

pub fn workout_routes() -> Router<AppState> {
    Router::new()
        .route("/workouts", get(list_workouts).post(log_workout))
        .route("/workouts/:id", delete(remove))
}

#[instrument(skip(state, payload))]
pub async fn log_workout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<LogWorkoutRequest>,
) -> AppResult<(StatusCode, Json<Workout>)> {
    payload.validate().map_err(AppError::BadRequest)?;
    let exercise = ExerciseItem::find_by_id(&state.db, payload.exercise_item_id)
        .await?
        .filter(|e| e.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Exercise item"))?;

    let duration = payload.duration_mins.unwrap_or(exercise.duration_mins).max(0);
    let performed_at = payload.performed_at.unwrap_or_else(OffsetDateTime::now_utc);
    let row = WorkoutRow::insert(&state.db, user_id, exercise.id, performed_at, duration).await?;
    info!(
        user_id = %user_id,
        workout_id = %row.id,
        exercise_item_id = %exercise.id,
        duration_mins = duration,
        "workout logged"
    );
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state))]
pub async fn list_workouts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<WorkoutListQuery>,
) -> AppResult<Json<Vec<Workout>>> {
    let (from, to) = q.bounds().map_err(AppError::BadRequest)?;
    let rows = WorkoutRow::list(&state.db, user_id, from, to, q.skip(), q.limit()).await?;
    Ok(Json(rows.into_iter().map(Workout::from).collect()))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !WorkoutRow::delete_owned(&state.db, id, user_id).await? {
        return Err(AppError::not_found("Workout"));
    }
    info!(user_id = %user_id, workout_id = %id, "workout deleted");
    Ok(StatusCode::NO_CONTENT)
}
