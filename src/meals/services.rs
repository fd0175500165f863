use std::collections::HashSet;
use std::future::Future;

use time::{Date, Time};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    catalog::repo_types::FoodItem,
    error::{AppError, AppResult},
    images::{
        handlers::ImageResponse,
        repo_types::Image,
        services::{presign, upload_image, UploadItem},
    },
    meals::{
        dto::{MealItemInput, MealResponse, PhotoMealResponse},
        repo::visible_food_ids,
        repo_types::{Meal, MealItemLine, MealWithItems},
    },
    state::AppState,
};

/// Foods in `items` that are neither predefined nor owned by the caller.
pub fn missing_foods(items: &[MealItemInput], visible: &HashSet<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|i| i.food_item_id)
        .filter(|id| !visible.contains(id) && seen.insert(*id))
        .collect()
}

/// Every referenced food must be visible to the user, else `NotFound`.
pub async fn ensure_foods_visible(
    st: &AppState,
    user_id: Uuid,
    items: &[MealItemInput],
) -> AppResult<()> {
    if items.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = items.iter().map(|i| i.food_item_id).collect();
    let visible = visible_food_ids(&st.db, user_id, &ids).await?;
    match missing_foods(items, &visible).first() {
        Some(id) => {
            warn!(user_id = %user_id, food_item_id = %id, "meal references unknown food");
            Err(AppError::not_found(format!("Food item {}", id)))
        }
        None => Ok(()),
    }
}

pub async fn load_with_items(st: &AppState, meals: Vec<Meal>) -> AppResult<Vec<MealWithItems>> {
    if meals.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = meals.iter().map(|m| m.id).collect();
    let lines = MealItemLine::for_meals(&st.db, &ids).await?;
    let images = Image::ids_for_meals(&st.db, &ids).await?;
    Ok(MealWithItems::assemble(meals, lines, images))
}

pub async fn load_one(st: &AppState, meal: Meal) -> AppResult<MealResponse> {
    load_with_items(st, vec![meal])
        .await?
        .pop()
        .map(MealResponse::from)
        .ok_or_else(|| AppError::not_found("Meal"))
}

#[instrument(skip(st, items))]
pub async fn create_meal(
    st: &AppState,
    user_id: Uuid,
    meal_date: Date,
    meal_time: Time,
    items: &[MealItemInput],
) -> AppResult<MealResponse> {
    ensure_foods_visible(st, user_id, items).await?;
    let meal = Meal::create(&st.db, user_id, meal_date, meal_time, items).await?;
    info!(user_id = %user_id, meal_id = %meal.id, items = items.len(), "meal created");
    load_one(st, meal).await
}

/// Passes `res` through, running `undo` first when it is an error. A failing
/// undo is logged and the original error is kept.
async fn undo_on_err<T, F, Fut>(res: AppResult<T>, undo: F) -> AppResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    if res.is_err() {
        match undo().await {
            Ok(true) => {}
            Ok(false) => warn!("nothing to undo after failed step"),
            Err(e) => warn!(error = ?e, "undo after failed step also failed"),
        }
    }
    res
}

/// New empty meal with the photo attached, best-effort analysis and catalog
/// suggestions for the detected food names.
#[instrument(skip(st, item))]
pub async fn create_from_photo(
    st: &AppState,
    user_id: Uuid,
    meal_date: Date,
    meal_time: Time,
    item: UploadItem,
) -> AppResult<PhotoMealResponse> {
    let meal = Meal::create(&st.db, user_id, meal_date, meal_time, &[]).await?;
    let meal_id = meal.id;
    let uploaded = upload_image(st, user_id, Some(meal_id), item, None).await;
    let image = undo_on_err(uploaded, || Meal::delete(&st.db, meal_id)).await?;
    let analysis = image.analysis();

    let suggestions = match &analysis {
        Some(a) if a.is_food && !a.food_items.is_empty() => {
            FoodItem::match_names(&st.db, user_id, &a.food_items).await?
        }
        _ => Vec::new(),
    };
    info!(
        user_id = %user_id,
        meal_id = %meal.id,
        analyzed = analysis.is_some(),
        suggestions = suggestions.len(),
        "meal created from photo"
    );

    let url = presign(st, &image.s3_key).await?;
    Ok(PhotoMealResponse {
        meal: load_one(st, meal).await?,
        image: ImageResponse { image, url },
        analysis,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: Uuid) -> MealItemInput {
        MealItemInput {
            food_item_id: id,
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn failed_upload_removes_the_new_meal() {
        let undone = std::cell::Cell::new(false);
        let res: AppResult<()> = Err(AppError::BadRequest("put_object failed".into()));
        let out = undo_on_err(res, || async {
            undone.set(true);
            Ok::<_, anyhow::Error>(true)
        })
        .await;
        assert!(matches!(out, Err(AppError::BadRequest(_))));
        assert!(undone.get());
    }

    #[tokio::test]
    async fn successful_upload_keeps_the_meal() {
        let undone = std::cell::Cell::new(false);
        let out = undo_on_err(Ok(7), || async {
            undone.set(true);
            Ok::<_, anyhow::Error>(true)
        })
        .await;
        assert_eq!(out.unwrap(), 7);
        assert!(!undone.get());
    }

    #[tokio::test]
    async fn failing_undo_keeps_the_original_error() {
        let res: AppResult<()> = Err(AppError::not_found("Meal"));
        let out = undo_on_err(res, || async { Err::<bool, _>(anyhow::anyhow!("db gone")) }).await;
        assert!(matches!(out, Err(AppError::NotFound(_))));
    }

    #[test]
    fn missing_foods_lists_invisible_ids() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let visible: HashSet<Uuid> = [a].into_iter().collect();
        assert!(missing_foods(&[input(a), input(a)], &visible).is_empty());
        assert_eq!(missing_foods(&[input(a), input(b), input(b)], &visible), vec![b]);
    }
}
