use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::catalog::repo_types::FoodItem;
use crate::images::{analysis::ImageAnalysis, handlers::ImageResponse};
use crate::meals::repo_types::{Meal, MealItemLine, MealWithItems};

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct MealItemInput {
    pub food_item_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn validate_items(items: &[MealItemInput]) -> Result<(), String> {
    match items.iter().find(|i| i.quantity <= 0) {
        Some(bad) => Err(format!(
            "quantity for food item {} must be positive",
            bad.food_item_id
        )),
        None => Ok(()),
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_meal_time(s: &str) -> Result<Time, String> {
    let s = s.trim();
    Time::parse(s, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(s, format_description!("[hour]:[minute]")))
        .map_err(|_| format!("invalid meal_time {:?}, expected HH:MM", s))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMealRequest {
    pub meal_date: Option<Date>,
    pub meal_time: Option<String>,
    #[serde(default)]
    pub items: Vec<MealItemInput>,
}

impl CreateMealRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = &self.meal_time {
            parse_meal_time(t)?;
        }
        validate_items(&self.items)
    }

    /// Missing date or time default to `now`.
    pub fn when(&self, now: OffsetDateTime) -> Result<(Date, Time), String> {
        let time = match &self.meal_time {
            Some(t) => parse_meal_time(t)?,
            None => Time::from_hms(now.hour(), now.minute(), now.second())
                .map_err(|e| e.to_string())?,
        };
        Ok((self.meal_date.unwrap_or(now.date()), time))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMealRequest {
    pub meal_date: Option<Date>,
    pub meal_time: Option<String>,
    /// Replaces all items when present.
    pub items: Option<Vec<MealItemInput>>,
}

impl UpdateMealRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = &self.meal_time {
            parse_meal_time(t)?;
        }
        match &self.items {
            Some(items) => validate_items(items),
            None => Ok(()),
        }
    }

    pub fn time(&self) -> Result<Option<Time>, String> {
        self.meal_time.as_deref().map(parse_meal_time).transpose()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MealListQuery {
    pub date: Option<Date>,
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl MealListQuery {
    /// Inclusive date bounds; a single `date` pins both ends.
    pub fn range(&self) -> Result<(Option<Date>, Option<Date>), String> {
        match (self.date, self.start, self.end) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                Err("use either date or start/end, not both".into())
            }
            (Some(d), None, None) => Ok((Some(d), Some(d))),
            (None, Some(s), Some(e)) if s > e => Err("start must not be after end".into()),
            (None, s, e) => Ok((s, e)),
        }
    }

    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    #[serde(flatten)]
    pub meal: Meal,
    pub items: Vec<MealItemLine>,
    pub image_ids: Vec<Uuid>,
    pub total_calories: i64,
}

impl From<MealWithItems> for MealResponse {
    fn from(m: MealWithItems) -> Self {
        let total_calories = m.total_calories();
        Self {
            meal: m.meal,
            items: m.items,
            image_ids: m.image_ids,
            total_calories,
        }
    }
}

/// Result of creating a meal from a photo.
#[derive(Debug, Serialize)]
pub struct PhotoMealResponse {
    pub meal: MealResponse,
    pub image: ImageResponse,
    pub analysis: Option<ImageAnalysis>,
    /// Catalog foods whose names match what the vision model detected.
    pub suggestions: Vec<FoodItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn meal_time_formats() {
        assert_eq!(parse_meal_time("08:15").unwrap(), time!(8:15));
        assert_eq!(parse_meal_time("19:05:30").unwrap(), time!(19:05:30));
        assert!(parse_meal_time("7pm").is_err());
        assert!(parse_meal_time("25:00").is_err());
    }

    #[test]
    fn create_defaults_to_now() {
        let now = datetime!(2024-03-10 18:45:12 UTC);
        let (d, t) = CreateMealRequest::default().when(now).unwrap();
        assert_eq!(d, date!(2024 - 03 - 10));
        assert_eq!(t, time!(18:45:12));
    }

    #[test]
    fn quantities_must_be_positive() {
        let req: CreateMealRequest = serde_json::from_str(&format!(
            r#"{{"items":[{{"food_item_id":"{}","quantity":0}}]}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreateMealRequest = serde_json::from_str(&format!(
            r#"{{"items":[{{"food_item_id":"{}"}}]}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(req.items[0].quantity, 1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn list_range_rules() {
        let d = date!(2024 - 01 - 02);
        let q = MealListQuery {
            date: Some(d),
            ..Default::default()
        };
        assert_eq!(q.range().unwrap(), (Some(d), Some(d)));

        let q = MealListQuery {
            date: Some(d),
            start: Some(d),
            ..Default::default()
        };
        assert!(q.range().is_err());

        let q = MealListQuery {
            start: Some(d),
            end: Some(date!(2024 - 01 - 01)),
            ..Default::default()
        };
        assert!(q.range().is_err());

        assert_eq!(MealListQuery::default().range().unwrap(), (None, None));
        assert_eq!(MealListQuery::default().limit(), 100);
    }
}
