use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{repo_types::User, services::load_active_user, AuthUser},
    catalog::{
        dto::{
            CatalogQuery, CreateExerciseRequest, CreateFoodRequest, UpdateExerciseRequest,
            UpdateFoodRequest,
        },
        repo_types::{ExerciseItem, FoodItem},
    },
    error::{still_referenced, AppError, AppResult},
    state::AppState,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods).post(create_food))
        .route(
            "/foods/:id",
            get(get_food).put(update_food).delete(delete_food),
        )
        .route("/exercises", get(list_exercises).post(create_exercise))
        .route(
            "/exercises/:id",
            get(get_exercise).put(update_exercise).delete(delete_exercise),
        )
}

/// Predefined items need an admin; user items need their owner.
fn ensure_can_modify(caller: &User, is_predefined: bool, owner: Option<Uuid>) -> AppResult<()> {
    let allowed = if is_predefined {
        caller.is_admin()
    } else {
        owner == Some(caller.id)
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Owner column for a new item; predefined items are global and creating them needs an admin.
fn new_item_owner(caller: &User, is_predefined: bool) -> AppResult<Option<Uuid>> {
    if !is_predefined {
        return Ok(Some(caller.id));
    }
    if !caller.is_admin() {
        warn!(user_id = %caller.id, "non-admin tried to create predefined item");
        return Err(AppError::Unauthorized);
    }
    Ok(None)
}

// --- foods ---

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<CatalogQuery>,
) -> AppResult<Json<Vec<FoodItem>>> {
    Ok(Json(FoodItem::list_visible(&state.db, user_id, &q).await?))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<FoodItem>> {
    let item = FoodItem::find_by_id(&state.db, id)
        .await?
        .filter(|f| f.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Food item"))?;
    Ok(Json(item))
}

#[instrument(skip(state, payload))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateFoodRequest>,
) -> AppResult<(StatusCode, Json<FoodItem>)> {
    payload.validate().map_err(AppError::BadRequest)?;
    let caller = load_active_user(&state.db, user_id).await?;
    let owner = new_item_owner(&caller, payload.is_predefined)?;

    let item = FoodItem::create(&state.db, owner, &payload).await?;
    info!(user_id = %user_id, food_item_id = %item.id, predefined = item.is_predefined, "food item created");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state, payload))]
pub async fn update_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFoodRequest>,
) -> AppResult<Json<FoodItem>> {
    payload.validate().map_err(AppError::BadRequest)?;
    let caller = load_active_user(&state.db, user_id).await?;
    let existing = FoodItem::find_by_id(&state.db, id)
        .await?
        .filter(|f| f.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Food item"))?;
    ensure_can_modify(&caller, existing.is_predefined, existing.user_id)?;

    let item = FoodItem::update(&state.db, id, &payload)
        .await?
        .ok_or_else(|| AppError::not_found("Food item"))?;
    info!(user_id = %user_id, food_item_id = %id, "food item updated");
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn delete_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let caller = load_active_user(&state.db, user_id).await?;
    let existing = FoodItem::find_by_id(&state.db, id)
        .await?
        .filter(|f| f.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Food item"))?;
    ensure_can_modify(&caller, existing.is_predefined, existing.user_id)?;

    FoodItem::delete(&state.db, id)
        .await
        .map_err(|e| still_referenced(e, "Food item"))?;
    info!(user_id = %user_id, food_item_id = %id, "food item deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- exercises ---

#[instrument(skip(state))]
pub async fn list_exercises(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<CatalogQuery>,
) -> AppResult<Json<Vec<ExerciseItem>>> {
    Ok(Json(ExerciseItem::list_visible(&state.db, user_id, &q).await?))
}

#[instrument(skip(state))]
pub async fn get_exercise(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ExerciseItem>> {
    let item = ExerciseItem::find_by_id(&state.db, id)
        .await?
        .filter(|e| e.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Exercise item"))?;
    Ok(Json(item))
}

#[instrument(skip(state, payload))]
pub async fn create_exercise(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateExerciseRequest>,
) -> AppResult<(StatusCode, Json<ExerciseItem>)> {
    payload.validate().map_err(AppError::BadRequest)?;
    let caller = load_active_user(&state.db, user_id).await?;
    let owner = new_item_owner(&caller, payload.is_predefined)?;

    let item = ExerciseItem::create(&state.db, owner, &payload).await?;
    info!(user_id = %user_id, exercise_item_id = %item.id, predefined = item.is_predefined, "exercise item created");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state, payload))]
pub async fn update_exercise(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExerciseRequest>,
) -> AppResult<Json<ExerciseItem>> {
    payload.validate().map_err(AppError::BadRequest)?;
    let caller = load_active_user(&state.db, user_id).await?;
    let existing = ExerciseItem::find_by_id(&state.db, id)
        .await?
        .filter(|e| e.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Exercise item"))?;
    ensure_can_modify(&caller, existing.is_predefined, existing.user_id)?;

    let item = ExerciseItem::update(&state.db, id, &payload)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise item"))?;
    info!(user_id = %user_id, exercise_item_id = %id, "exercise item updated");
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn delete_exercise(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let caller = load_active_user(&state.db, user_id).await?;
    let existing = ExerciseItem::find_by_id(&state.db, id)
        .await?
        .filter(|e| e.is_visible_to(user_id))
        .ok_or_else(|| AppError::not_found("Exercise item"))?;
    ensure_can_modify(&caller, existing.is_predefined, existing.user_id)?;

    ExerciseItem::delete(&state.db, id)
        .await
        .map_err(|e| still_referenced(e, "Exercise item"))?;
    info!(user_id = %user_id, exercise_item_id = %id, "exercise item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Sam".into(),
            email: "sam@example.com".into(),
            password_hash: String::new(),
            role: role.into(),
            age: None,
            gender: None,
            weight_kg: None,
            height_cm: None,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn predefined_items_need_admin() {
        let admin = user("admin");
        let regular = user("user");
        assert!(ensure_can_modify(&admin, true, None).is_ok());
        assert!(matches!(
            ensure_can_modify(&regular, true, None),
            Err(AppError::Unauthorized)
        ));
        assert_eq!(new_item_owner(&admin, true).unwrap(), None);
        assert!(new_item_owner(&regular, true).is_err());
    }

    #[test]
    fn user_items_only_editable_by_owner() {
        let owner = user("user");
        let admin = user("admin");
        assert!(ensure_can_modify(&owner, false, Some(owner.id)).is_ok());
        assert!(ensure_can_modify(&admin, false, Some(owner.id)).is_err());
        assert_eq!(new_item_owner(&owner, false).unwrap(), Some(owner.id));
    }
}
