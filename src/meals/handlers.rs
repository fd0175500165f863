use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use time::{Date, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    images::{
        handlers::MAX_UPLOAD_BYTES,
        repo_types::Image,
        services::{presign, UploadForm},
    },
    meals::{
        dto::{
            CreateMealRequest, MealListQuery, MealResponse, PhotoMealResponse, UpdateMealRequest,
        },
        repo_types::Meal,
        services::{create_from_photo, create_meal, ensure_foods_visible, load_one, load_with_items},
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/today", get(today_meals))
        .route("/meals/:id", get(get_meal))
        .route("/meals/:id/photo", get(get_presigned_photo))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create))
        .route("/meals/:id", put(update).delete(remove))
        .route("/meals/photo", post(create_with_photo))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn owned_meal(state: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Meal> {
    Meal::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Meal"))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMealRequest>,
) -> AppResult<(StatusCode, Json<MealResponse>)> {
    payload.validate().map_err(AppError::BadRequest)?;
    let (date, time) = payload
        .when(OffsetDateTime::now_utc())
        .map_err(AppError::BadRequest)?;
    let meal = create_meal(&state, user_id, date, time, &payload.items).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<MealListQuery>,
) -> AppResult<Json<Vec<MealResponse>>> {
    let (start, end) = q.range().map_err(AppError::BadRequest)?;
    let meals = Meal::list(&state.db, user_id, start, end, q.skip(), q.limit()).await?;
    let out = load_with_items(&state, meals).await?;
    Ok(Json(out.into_iter().map(MealResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn today_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<MealResponse>>> {
    let today: Date = OffsetDateTime::now_utc().date();
    let meals = Meal::list(&state.db, user_id, Some(today), Some(today), 0, 500).await?;
    let out = load_with_items(&state, meals).await?;
    Ok(Json(out.into_iter().map(MealResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealResponse>> {
    let meal = owned_meal(&state, id, user_id).await?;
    Ok(Json(load_one(&state, meal).await?))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMealRequest>,
) -> AppResult<Json<MealResponse>> {
    payload.validate().map_err(AppError::BadRequest)?;
    let time = payload.time().map_err(AppError::BadRequest)?;
    owned_meal(&state, id, user_id).await?;
    if let Some(items) = &payload.items {
        ensure_foods_visible(&state, user_id, items).await?;
    }

    let meal = Meal::update(
        &state.db,
        id,
        payload.meal_date,
        time,
        payload.items.as_deref(),
    )
    .await?;
    info!(user_id = %user_id, meal_id = %id, items_replaced = payload.items.is_some(), "meal updated");
    Ok(Json(load_one(&state, meal).await?))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    owned_meal(&state, id, user_id).await?;
    Meal::delete(&state.db, id).await?;
    info!(user_id = %user_id, meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /meals/photo (multipart: `file`, optional `meal_date`, `meal_time`)
#[instrument(skip(state, mp))]
pub async fn create_with_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<PhotoMealResponse>)> {
    let mut form = UploadForm::read(mp).await?;
    let item = form.take_image()?;

    let meal_date = form
        .text("meal_date")
        .map(|d| {
            Date::parse(&d, time::macros::format_description!("[year]-[month]-[day]"))
                .map_err(|_| AppError::BadRequest(format!("invalid meal_date {:?}", d)))
        })
        .transpose()?;
    let req = CreateMealRequest {
        meal_date,
        meal_time: form.text("meal_time"),
        items: Vec::new(),
    };
    req.validate().map_err(AppError::BadRequest)?;
    let (date, time) = req
        .when(OffsetDateTime::now_utc())
        .map_err(AppError::BadRequest)?;

    let out = create_from_photo(&state, user_id, date, time, item).await?;
    Ok((StatusCode::CREATED, Json(out)))
}

/// 302 to a presigned URL of the meal's first photo.
#[instrument(skip(state))]
pub async fn get_presigned_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    owned_meal(&state, id, user_id).await?;
    let image = Image::first_for_meal(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Photo"))?;
    let url = presign(&state, &image.s3_key).await?;
    Ok(Redirect::temporary(&url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRef, http::Request};
    use tower::ServiceExt;

    use crate::auth::services::JwtKeys;

    fn app() -> Router {
        Router::new()
            .merge(read_routes())
            .merge(write_routes())
            .with_state(AppState::fake())
    }

    fn token() -> String {
        JwtKeys::from_ref(&AppState::fake())
            .sign_access(Uuid::new_v4())
            .unwrap()
    }

    #[tokio::test]
    async fn listing_requires_token() {
        let res = app()
            .oneshot(Request::get("/meals").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn conflicting_range_is_rejected_before_db() {
        let res = app()
            .oneshot(
                Request::get("/meals?date=2024-01-01&start=2024-01-01")
                    .header("authorization", format!("Bearer {}", token()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_db() {
        let body = format!(
            r#"{{"meal_time":"12:00","items":[{{"food_item_id":"{}","quantity":0}}]}}"#,
            Uuid::new_v4()
        );
        let res = app()
            .oneshot(
                Request::post("/meals")
                    .header("authorization", format!("Bearer {}", token()))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_meal_time_is_rejected() {
        let res = app()
            .oneshot(
                Request::post("/meals")
                    .header("authorization", format!("Bearer {}", token()))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"meal_time":"noon"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
