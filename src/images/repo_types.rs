use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::images::analysis::{ImageAnalysis, Nutrients};

/// An uploaded photo and, once analysis succeeded, what the vision model saw.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_id: Option<Uuid>,
    pub s3_key: String,
    pub original_filename: Option<String>,
    pub content_type: String,
    pub file_size: i64,
    pub description: Option<String>,
    pub is_food: Option<bool>,
    pub analysis_description: Option<String>,
    pub food_items: Option<Json<Vec<String>>>,
    pub estimated_calories: Option<f64>,
    pub nutrients: Option<Json<Nutrients>>,
    pub analysis_confidence: Option<f64>,
    pub analysis_completed: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl Image {
    /// `None` until an analysis has been recorded.
    pub fn analysis(&self) -> Option<ImageAnalysis> {
        self.analysis_completed?;
        Some(ImageAnalysis {
            is_food: self.is_food.unwrap_or(false),
            food_items: self
                .food_items
                .as_ref()
                .map(|j| j.0.clone())
                .unwrap_or_default(),
            description: self.analysis_description.clone().unwrap_or_default(),
            estimated_calories: self.estimated_calories.unwrap_or(0.0),
            nutrients: self
                .nutrients
                .as_ref()
                .map(|j| j.0.clone())
                .unwrap_or_default(),
            confidence: self.analysis_confidence.unwrap_or(0.0),
        })
    }
}

pub struct NewImage<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_id: Option<Uuid>,
    pub s3_key: &'a str,
    pub original_filename: Option<&'a str>,
    pub content_type: &'a str,
    pub file_size: i64,
    pub description: Option<&'a str>,
}

#[cfg(test)]
pub(crate) fn sample_image(user_id: Uuid) -> Image {
    Image {
        id: Uuid::new_v4(),
        user_id,
        meal_id: None,
        s3_key: format!("images/{}/x.jpg", user_id),
        original_filename: Some("lunch.jpg".into()),
        content_type: "image/jpeg".into(),
        file_size: 3,
        description: None,
        is_food: None,
        analysis_description: None,
        food_items: None,
        estimated_calories: None,
        nutrients: None,
        analysis_confidence: None,
        analysis_completed: None,
        created_at: OffsetDateTime::now_utc(),
    }
}
