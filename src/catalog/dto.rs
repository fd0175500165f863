use serde::Deserialize;

use crate::catalog::repo_types::{Difficulty, FoodCategory};

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 500;

/// `?search=&skip=&limit=` for catalog listings.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl CatalogQuery {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    /// ILIKE pattern for the name filter, if any.
    pub fn pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFoodRequest {
    pub name: String,
    pub calories: i32,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub category: Option<FoodCategory>,
    #[serde(default)]
    pub is_predefined: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFoodRequest {
    pub name: Option<String>,
    pub calories: Option<i32>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub category: Option<FoodCategory>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExerciseRequest {
    pub name: String,
    pub duration_mins: i32,
    pub calories_burnt: i32,
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub requires_equipment: bool,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub is_predefined: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExerciseRequest {
    pub name: Option<String>,
    pub duration_mins: Option<i32>,
    pub calories_burnt: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub requires_equipment: Option<bool>,
    pub muscle_groups: Option<Vec<String>>,
}

fn check_macros(values: &[Option<f64>]) -> Result<(), String> {
    if values.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("macronutrients must be non-negative".into());
    }
    Ok(())
}

impl CreateFoodRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.calories < 0 {
            return Err("calories must be non-negative".into());
        }
        check_macros(&[self.protein_g, self.carbs_g, self.fat_g, self.fiber_g])
    }
}

impl UpdateFoodRequest {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("name must not be empty".into());
        }
        if matches!(self.calories, Some(c) if c < 0) {
            return Err("calories must be non-negative".into());
        }
        check_macros(&[self.protein_g, self.carbs_g, self.fat_g, self.fiber_g])
    }
}

impl CreateExerciseRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.duration_mins <= 0 {
            return Err("duration_mins must be positive".into());
        }
        if self.calories_burnt < 0 {
            return Err("calories_burnt must be non-negative".into());
        }
        Ok(())
    }
}

impl UpdateExerciseRequest {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("name must not be empty".into());
        }
        if matches!(self.duration_mins, Some(d) if d <= 0) {
            return Err("duration_mins must be positive".into());
        }
        if matches!(self.calories_burnt, Some(c) if c < 0) {
            return Err("calories_burnt must be non-negative".into());
        }
        Ok(())
    }
}
